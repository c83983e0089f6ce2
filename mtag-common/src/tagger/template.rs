//! String templates for the template setter
//!
//! Placeholders are written `{name}` or `{name:spec}` where spec is
//! `[[fill]align][0][width]` with align one of `<`, `>`, `^`. Literal
//! braces are escaped by doubling them. Each placeholder resolves to a
//! configured [`Getter`] of the same name or, failing that, the item's
//! field of that name. Absent values render as empty text.

use super::getter::Getter;
use crate::error::ConfigError;
use crate::field::Field;
use crate::track::TagItem;
use crate::value::TagValue;
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Right,
    Center,
}

/// Parsed `:spec` of a placeholder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct FormatSpec {
    fill: Option<char>,
    align: Option<Align>,
    zero: bool,
    width: usize,
}

impl FormatSpec {
    fn parse(spec: &str) -> Option<Self> {
        let mut result = FormatSpec::default();
        let chars: Vec<char> = spec.chars().collect();
        let mut pos = 0;

        let align_of = |c: char| match c {
            '<' => Some(Align::Left),
            '>' => Some(Align::Right),
            '^' => Some(Align::Center),
            _ => None,
        };

        if chars.len() >= 2 {
            if let Some(align) = align_of(chars[1]) {
                result.fill = Some(chars[0]);
                result.align = Some(align);
                pos = 2;
            }
        }
        if pos == 0 {
            if let Some(align) = chars.first().copied().and_then(align_of) {
                result.align = Some(align);
                pos = 1;
            }
        }

        if chars.get(pos) == Some(&'0') {
            result.zero = true;
            pos += 1;
        }

        let digits: String = chars[pos..].iter().collect();
        if !digits.is_empty() {
            result.width = digits.parse().ok()?;
        }
        Some(result)
    }

    fn apply(&self, value: Option<&TagValue>) -> String {
        let text = value.map(ToString::to_string).unwrap_or_default();
        let length = text.chars().count();
        if length >= self.width {
            return text;
        }

        let numeric = matches!(value, Some(TagValue::Integer(_)) | Some(TagValue::Float(_)));
        if self.zero && self.align.is_none() && self.fill.is_none() && numeric {
            return super::getter::zero_pad(&text, self.width);
        }

        let fill = self
            .fill
            .unwrap_or(if self.zero && self.align.is_none() { '0' } else { ' ' });
        let align = self
            .align
            .unwrap_or(if numeric { Align::Right } else { Align::Left });
        let total = self.width - length;
        let (left, right) = match align {
            Align::Left => (0, total),
            Align::Right => (total, 0),
            Align::Center => (total / 2, total - total / 2),
        };

        let pad = |n: usize| std::iter::repeat(fill).take(n).collect::<String>();
        format!("{}{}{}", pad(left), text, pad(right))
    }
}

/// Where a placeholder's value comes from
#[derive(Debug, Clone)]
enum Source {
    Getter(usize),
    Field(Field),
}

#[derive(Debug, Clone)]
enum Segment {
    Literal(String),
    Placeholder { source: Source, spec: FormatSpec },
}

/// A validated template with its named getters
#[derive(Debug, Clone)]
pub struct Template {
    source: String,
    getters: Vec<(String, Getter)>,
    segments: Vec<Segment>,
}

/// Split a template into literal text and `(name, spec)` placeholders
fn parse(template: &str) -> Result<Vec<(Option<String>, String)>, ConfigError> {
    let unbalanced = |message: &str| ConfigError::new(message).with_key("template").with_value(template);

    let mut parts = Vec::new();
    let mut literal = String::new();
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                literal.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                literal.push('}');
            }
            '}' => return Err(unbalanced("Single '}' encountered in template")),
            '{' => {
                let mut inner = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some('{') => return Err(unbalanced("Unexpected '{' in placeholder")),
                        Some(c) => inner.push(c),
                        None => return Err(unbalanced("Unterminated placeholder in template")),
                    }
                }
                if !literal.is_empty() {
                    parts.push((None, std::mem::take(&mut literal)));
                }
                let (name, spec) = inner.split_once(':').unwrap_or((inner.as_str(), ""));
                let name = name.trim();
                if name.is_empty() {
                    return Err(unbalanced("Template placeholders must be named"));
                }
                parts.push((Some(name.to_string()), spec.to_string()));
            }
            c => literal.push(c),
        }
    }
    if !literal.is_empty() {
        parts.push((None, literal));
    }
    Ok(parts)
}

impl Template {
    /// Parse `source` and resolve every placeholder
    ///
    /// Fails when a placeholder is neither a configured getter nor a field name.
    pub fn new(source: impl Into<String>, getters: Vec<(String, Getter)>) -> Result<Self, ConfigError> {
        let source = source.into();
        let mut segments = Vec::new();
        let mut missing = BTreeSet::new();

        for (name, text) in parse(&source)? {
            let Some(name) = name else {
                segments.push(Segment::Literal(text));
                continue;
            };

            let spec = FormatSpec::parse(&text).ok_or_else(|| {
                ConfigError::new("Unsupported format spec in template")
                    .with_key(name.as_str())
                    .with_value(&text)
            })?;

            let origin = match getters.iter().position(|(key, _)| *key == name) {
                Some(index) => Source::Getter(index),
                None => match Field::from_name(&name) {
                    Ok(field) => Source::Field(field),
                    Err(_) => {
                        missing.insert(name);
                        continue;
                    }
                },
            };
            segments.push(Segment::Placeholder { source: origin, spec });
        }

        if !missing.is_empty() {
            let names: Vec<String> = missing.into_iter().collect();
            return Err(ConfigError::new(format!(
                "Template contains fields which have not been configured: {}",
                names.join(", ")
            ))
            .with_key("template")
            .with_value(&source));
        }

        Ok(Self {
            source,
            getters,
            segments,
        })
    }

    /// The template text as configured
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn getters(&self) -> &[(String, Getter)] {
        &self.getters
    }

    pub fn render<T: TagItem>(&self, item: &T) -> String {
        let mut output = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => output.push_str(text),
                Segment::Placeholder { source, spec } => {
                    let value = match source {
                        Source::Getter(index) => self.getters[*index].1.get(item),
                        Source::Field(field) => item.get(*field),
                    };
                    output.push_str(&spec.apply(value.as_ref()));
                }
            }
        }
        output
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}'", self.source)?;
        if !self.getters.is_empty() {
            let getters: Vec<String> = self
                .getters
                .iter()
                .map(|(name, getter)| format!("{}={}", name, getter))
                .collect();
            write!(f, " with {}", getters.join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tagger::getter::{PathGetter, TagGetter};
    use crate::track::Track;

    fn track() -> Track {
        Track::new("/music/Artist/Album/03 - Song.flac")
            .with(Field::Title, "Song")
            .with(Field::Album, "Album")
            .with(Field::TrackNumber, 3_i64)
            .with(Field::Genres, TagValue::List(vec!["Rock".into(), "Pop".into()]))
    }

    #[test]
    fn test_renders_fields_directly() {
        let template = Template::new("{album} - {title}", Vec::new()).unwrap();
        assert_eq!(template.render(&track()), "Album - Song");
    }

    #[test]
    fn test_renders_configured_getters() {
        let getters = vec![
            ("folder_name".to_string(), Getter::Path(PathGetter::new(1).unwrap())),
            ("name".to_string(), Getter::Tag(TagGetter::new(Field::Album))),
        ];
        let template = Template::new("{folder_name}: {name}", getters).unwrap();
        assert_eq!(template.render(&track()), "Album: Album", "getters shadow field names");
    }

    #[test]
    fn test_missing_values_render_empty() {
        let template = Template::new("[{year}]", Vec::new()).unwrap();
        assert_eq!(template.render(&track()), "[]");
    }

    #[test]
    fn test_lists_join_with_comma() {
        let template = Template::new("{genres}", Vec::new()).unwrap();
        assert_eq!(template.render(&track()), "Rock, Pop");
    }

    #[test]
    fn test_format_spec_padding() {
        let template = Template::new("{track_number:02}|{title:>6}|{title:-<6}|{title:^8}", Vec::new()).unwrap();
        assert_eq!(template.render(&track()), "03|  Song|Song--|  Song  ");
    }

    #[test]
    fn test_escaped_braces() {
        let template = Template::new("{{{title}}}", Vec::new()).unwrap();
        assert_eq!(template.render(&track()), "{Song}");
    }

    #[test]
    fn test_unconfigured_placeholders_rejected() {
        let err = Template::new("{title} {new_value} {other}", Vec::new()).unwrap_err();
        assert!(err.message.ends_with(": new_value, other"), "{}", err.message);
    }

    #[test]
    fn test_unbalanced_braces_rejected() {
        assert!(Template::new("{title", Vec::new()).is_err());
        assert!(Template::new("title}", Vec::new()).is_err());
        assert!(Template::new("{}", Vec::new()).is_err());
    }
}
