//! End-to-end tests for the auto-tagging rule engine
//!
//! Rules are built from YAML exactly as they appear in a config file and
//! applied to in-memory tracks grouped into album collections.

use mtag_common::{Collection, Field, TagItem, TagValue, Tagger, Track};

fn tagger_from_yaml(yaml: &str) -> Tagger {
    serde_yaml::from_str(yaml).expect("rules should parse")
}

/// 30 tracks over three albums of 10; odd tracks carry album "X"
fn library() -> (Vec<Track>, Vec<Collection>) {
    let mut tracks = Vec::new();
    let mut collections = Vec::new();

    for album in 0..3 {
        let mut collection = Collection::new(format!("folder {}", album), Vec::new());
        for n in 0..10_i64 {
            let index = tracks.len();
            let album_name = if index % 2 == 1 { "X" } else { "Y" };
            tracks.push(
                Track::new(format!("/music/folder {}/{:02} - track.flac", album, 10 - n))
                    .with(Field::Title, format!("title {}", index))
                    .with(Field::Artist, "artist")
                    .with(Field::Album, album_name)
                    .with(Field::TrackNumber, n + 1),
            );
            collection.push(index);
        }
        collections.push(collection);
    }

    (tracks, collections)
}

#[test]
fn test_filtered_rule_only_touches_matching_tracks() {
    let (mut tracks, collections) = library();
    let tagger = tagger_from_yaml(
        r#"
- filter:
    field: album
    is: X
  title: T
  artist: A
"#,
    );

    tagger.set_tags(&mut tracks, &collections);

    let matched: Vec<&Track> = tracks
        .iter()
        .filter(|t| t.get(Field::Album) == Some("X".into()))
        .collect();
    assert_eq!(matched.len(), 15);
    for track in &matched {
        assert_eq!(track.get(Field::Title), Some("T".into()));
        assert_eq!(track.get(Field::Artist), Some("A".into()));
    }

    for (index, track) in tracks.iter().enumerate().filter(|(i, _)| i % 2 == 0) {
        assert_eq!(track.get(Field::Title), Some(format!("title {}", index).into()));
        assert_eq!(track.get(Field::Artist), Some("artist".into()));
        assert!(!track.is_changed());
    }
}

#[test]
fn test_rule_without_filter_applies_to_every_track() {
    let (mut tracks, collections) = library();
    let tagger = tagger_from_yaml(
        r#"
- compilation: true
  comments:
    operation: clear
"#,
    );

    tagger.set_tags(&mut tracks, &collections);
    assert!(tracks
        .iter()
        .all(|t| t.get(Field::Compilation) == Some(TagValue::Bool(true))));
}

#[test]
fn test_album_numbering_per_collection() {
    let (mut tracks, collections) = library();
    let tagger = tagger_from_yaml(
        r#"
- track_number:
    operation: incremental
    sort: [filename]
  track_total:
    operation: max
    field: track_number
  title:
    operation: template
    template: "{track_number:02}/{track_total} {folder_name}"
    folder_name:
      field: path
      parent: 1
"#,
    );

    tagger.set_tags(&mut tracks, &collections);

    // file names count down from 10 within each folder
    for (index, track) in tracks.iter().enumerate() {
        let expected = 10 - (index % 10) as i64;
        assert_eq!(track.get(Field::TrackNumber), Some(TagValue::Integer(expected)));
    }

    // the last track of a folder is processed after all its peers are numbered
    let last = &tracks[29];
    assert_eq!(last.get(Field::TrackTotal), Some(TagValue::Integer(10)));
    assert_eq!(last.get(Field::Title), Some("01/10 folder 2".into()));
}

#[test]
fn test_conditional_setters_and_getters() {
    let (mut tracks, collections) = library();
    let tagger = tagger_from_yaml(
        r#"
- album_artist:
    field: artist
    when:
      field: track_number
      less_than: 3
  genres:
    operation: join
    separator: " "
    values:
      - album
      - field: track_number
        when:
          field: album
          is: X
        leading_zeros: 3
"#,
    );

    tagger.set_tags(&mut tracks, &collections);

    assert_eq!(tracks[0].get(Field::AlbumArtist), Some("artist".into()));
    assert_eq!(tracks[5].get(Field::AlbumArtist), None);

    assert_eq!(
        tracks[1].get(Field::Genres),
        Some(TagValue::List(vec!["X 002".into()]))
    );
    assert_eq!(
        tracks[2].get(Field::Genres),
        Some(TagValue::List(vec!["Y ".into()]))
    );
}

#[test]
fn test_invalid_rules_fail_before_tagging() {
    let cases = [
        "- title: {operation: template, template: '{unknown_placeholder}'}",
        "- track_number: {operation: incremental, group: [genres]}",
        "- title: {operation: join, values: [{field: path, parent: -1}]}",
        "- title: {operation: something}",
        "- not_a_field: value",
        "- filter: {field: album, roughly: X}\n  title: T",
    ];
    for yaml in cases {
        assert!(
            serde_yaml::from_str::<Tagger>(yaml).is_err(),
            "expected config error for {}",
            yaml
        );
    }
}
