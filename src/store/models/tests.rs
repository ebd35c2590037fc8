use super::*;

#[test]
fn file_kind_display_round_trip() {
    for kind in [
        FileKind::Pdf,
        FileKind::PlainText,
        FileKind::Word,
        FileKind::Markdown,
        FileKind::DirectText,
    ] {
        let parsed: FileKind = kind.to_string().parse().expect("display output parses");
        assert_eq!(parsed, kind);
    }
}

#[test]
fn file_kind_accepts_extension_aliases() {
    assert_eq!("md".parse::<FileKind>(), Ok(FileKind::Markdown));
    assert_eq!("txt".parse::<FileKind>(), Ok(FileKind::PlainText));
    assert_eq!("docx".parse::<FileKind>(), Ok(FileKind::Word));
    assert!("exe".parse::<FileKind>().is_err());
}

#[test]
fn difficulty_and_content_kind_parse() {
    assert_eq!("hard".parse::<Difficulty>(), Ok(Difficulty::Hard));
    assert!("extreme".parse::<Difficulty>().is_err());

    assert_eq!("exam".parse::<ContentKind>(), Ok(ContentKind::Exam));
    assert!("homework".parse::<ContentKind>().is_err());
}

#[test]
fn embedding_blob_round_trip() {
    let vector = vec![0.0_f32, 1.5, -2.25, f32::MIN_POSITIVE, 1234.5678];
    let bytes = encode_embedding(&vector);
    assert_eq!(bytes.len(), vector.len() * 4);

    let decoded = decode_embedding(&bytes).expect("well-formed blob decodes");
    assert_eq!(decoded, vector);
}

#[test]
fn truncated_embedding_blob_rejected() {
    let bytes = encode_embedding(&[1.0, 2.0]);
    let result = decode_embedding(&bytes[..7]);
    assert!(result.is_err());
}

#[test]
fn empty_filter_reports_empty() {
    assert!(DocumentFilter::default().is_empty());

    let filter = DocumentFilter {
        subject: Some("physics".to_string()),
        ..DocumentFilter::default()
    };
    assert!(!filter.is_empty());
}
