//! Integration tests for the license stamping library

use license_stamp::config::StampConfig;
use license_stamp::pdf::{
    count_images, count_pages, extract_metadata, stamp_file, stamp_pdf, FooterPosition,
    StampOptions,
};
use license_stamp::Error;
use lopdf::{Dictionary, Document, IncrementalDocument, Object, Stream};
use tempfile::TempDir;

/// Build an in-memory PDF with `page_count` A4 pages of sample text
fn sample_pdf(page_count: usize) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut font = Dictionary::new();
    font.set("Type", Object::Name(b"Font".to_vec()));
    font.set("Subtype", Object::Name(b"Type1".to_vec()));
    font.set("BaseFont", Object::Name(b"Helvetica".to_vec()));
    let font_id = doc.add_object(Object::Dictionary(font));

    let mut kids = Vec::new();
    for i in 0..page_count {
        let content = format!(
            "BT\n/F1 24 Tf\n50 750 Td\n(Test PDF Document page {}) Tj\nET\n\
             BT\n/F1 12 Tf\n50 700 Td\n(This is a sample PDF for testing the stamping functionality.) Tj\nET\n",
            i + 1
        );
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));

        let mut fonts = Dictionary::new();
        fonts.set("F1", Object::Reference(font_id));
        let mut resources = Dictionary::new();
        resources.set("Font", Object::Dictionary(fonts));

        let mut page = Dictionary::new();
        page.set("Type", Object::Name(b"Page".to_vec()));
        page.set("Parent", Object::Reference(pages_id));
        page.set("MediaBox", Object::Array(vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(595),
            Object::Integer(842),
        ]));
        page.set("Contents", Object::Reference(content_id));
        page.set("Resources", Object::Dictionary(resources));
        kids.push(Object::Reference(doc.add_object(Object::Dictionary(page))));
    }

    let mut pages = Dictionary::new();
    pages.set("Type", Object::Name(b"Pages".to_vec()));
    pages.set("Count", Object::Integer(page_count as i64));
    pages.set("Kids", Object::Array(kids));
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference(pages_id));
    let catalog_id = doc.add_object(Object::Dictionary(catalog));
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("Failed to build sample PDF");
    bytes
}

/// A one-page PDF whose large original content stream was replaced by a
/// small one in an incremental update
fn incrementally_updated_pdf() -> Vec<u8> {
    let mut doc = Document::load_mem(&sample_pdf(1)).unwrap();
    let page_id = *doc.get_pages().values().next().unwrap();
    let content_id = doc.get_page_contents(page_id)[0];

    let large = "BT\n/F1 12 Tf\n50 700 Td\n(First revision filler text) Tj\nET\n".repeat(2000);
    doc.objects.insert(content_id, Object::Stream(Stream::new(Dictionary::new(), large.into_bytes())));
    let mut first_revision = Vec::new();
    doc.save_to(&mut first_revision).unwrap();

    let prev = Document::load_mem(&first_revision).unwrap();
    let mut incremental = IncrementalDocument::create_from(first_revision, prev);
    incremental.new_document.set_object(
        content_id,
        Stream::new(Dictionary::new(), b"BT\n/F1 12 Tf\n50 700 Td\n(Second revision) Tj\nET\n".to_vec()),
    );

    let mut bytes = Vec::new();
    incremental.save_to(&mut bytes).unwrap();
    bytes
}

/// A one-page PDF whose MediaBox and Resources live on the Pages node
fn inherited_resources_pdf() -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut font = Dictionary::new();
    font.set("Type", Object::Name(b"Font".to_vec()));
    font.set("Subtype", Object::Name(b"Type1".to_vec()));
    font.set("BaseFont", Object::Name(b"Helvetica".to_vec()));
    let font_id = doc.add_object(Object::Dictionary(font));

    let mut fonts = Dictionary::new();
    fonts.set("F1", Object::Reference(font_id));
    let mut resources = Dictionary::new();
    resources.set("Font", Object::Dictionary(fonts));
    let resources_id = doc.add_object(Object::Dictionary(resources));

    let content = b"BT\n/F1 12 Tf\n50 700 Td\n(Inherited resources) Tj\nET\n".to_vec();
    let content_id = doc.add_object(Stream::new(Dictionary::new(), content));

    let mut page = Dictionary::new();
    page.set("Type", Object::Name(b"Page".to_vec()));
    page.set("Parent", Object::Reference(pages_id));
    page.set("Contents", Object::Reference(content_id));
    let page_id = doc.add_object(Object::Dictionary(page));

    let mut pages = Dictionary::new();
    pages.set("Type", Object::Name(b"Pages".to_vec()));
    pages.set("Count", Object::Integer(1));
    pages.set("Kids", Object::Array(vec![Object::Reference(page_id)]));
    pages.set("Resources", Object::Reference(resources_id));
    pages.set("MediaBox", Object::Array(vec![
        Object::Integer(0),
        Object::Integer(0),
        Object::Integer(595),
        Object::Integer(842),
    ]));
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference(pages_id));
    let catalog_id = doc.add_object(Object::Dictionary(catalog));
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("Failed to build inherited resources PDF");
    bytes
}

fn jane_smith(position: FooterPosition) -> StampOptions {
    StampOptions {
        customer_name: "Jane Smith".to_string(),
        organization: Some("Limerick Cathedral Choir".to_string()),
        order_number: "CAIL-1234".to_string(),
        licensed_quantity: 35,
        license_id: "test-license-123".to_string(),
        date_iso: "2024-01-15".to_string(),
        footer_position: position,
    }
}

/// Decompressed content of every stamp Form XObject in a document
fn stamp_contents(pdf_bytes: &[u8]) -> Vec<String> {
    let mut doc = Document::load_mem(pdf_bytes).expect("Stamped output should load");
    doc.decompress();

    doc.objects
        .values()
        .filter_map(|obj| match obj {
            Object::Stream(stream) => {
                let is_form = matches!(
                    stream.dict.get(b"Subtype").and_then(|s| s.as_name()),
                    Ok(b"Form")
                );
                is_form.then(|| String::from_utf8_lossy(&stream.content).into_owned())
            }
            _ => None,
        })
        .collect()
}

#[test]
fn test_stamp_bottom_scenario() {
    let input = sample_pdf(1);
    let output = stamp_pdf(&input, &jane_smith(FooterPosition::Bottom), &StampConfig::default())
        .expect("Failed to stamp PDF");

    assert_eq!(&output[..4], b"%PDF");
    assert!(output.len() > input.len(), "stamping should only add content");
    assert_eq!(count_pages(&output).unwrap(), 1);
    assert_eq!(count_images(&output).unwrap(), 1, "one embedded QR image");

    let contents = stamp_contents(&output);
    assert_eq!(contents.len(), 1);
    assert_eq!(contents[0].matches(" Tj").count(), 2, "two footer lines");
    assert_eq!(contents[0].matches("/Qr Do").count(), 1);
}

#[test]
fn test_stamp_diagonal_differs_from_bottom() {
    let input = sample_pdf(1);
    let config = StampConfig::default();

    let bottom = stamp_pdf(&input, &jane_smith(FooterPosition::Bottom), &config).unwrap();
    let diagonal = stamp_pdf(&input, &jane_smith(FooterPosition::Diagonal), &config).unwrap();

    assert_eq!(count_pages(&diagonal).unwrap(), 1);
    assert_ne!(bottom.len(), diagonal.len());

    let contents = stamp_contents(&diagonal);
    assert_eq!(contents[0].matches("BT\n").count(), 1, "watermark is a single text object");
    assert!(contents[0].contains("60 0 0 60 515 20 cm"), "QR stays in the corner");
}

#[test]
fn test_page_count_preserved() {
    for pages in [0, 1, 3, 7] {
        let input = sample_pdf(pages);
        for position in [FooterPosition::Bottom, FooterPosition::Diagonal] {
            let output = stamp_pdf(&input, &jane_smith(position), &StampConfig::default())
                .unwrap_or_else(|e| panic!("{} pages, {}: {}", pages, position, e));

            assert_eq!(count_pages(&output).unwrap(), pages);
            assert!(output.len() >= input.len());
            assert_eq!(stamp_contents(&output).len(), pages, "one stamp per page");
        }
    }
}

#[test]
fn test_zero_page_document() {
    let input = sample_pdf(0);
    let output = stamp_pdf(&input, &jane_smith(FooterPosition::Bottom), &StampConfig::default())
        .expect("Zero-page documents are valid input");

    let metadata = extract_metadata(&output).unwrap();
    assert_eq!(metadata.page_count, 0);
    assert!(stamp_contents(&output).is_empty());
}

#[test]
fn test_qr_image_shared_across_pages() {
    let output = stamp_pdf(&sample_pdf(5), &jane_smith(FooterPosition::Bottom), &StampConfig::default())
        .unwrap();
    assert_eq!(count_images(&output).unwrap(), 1);
}

#[test]
fn test_organization_increases_output() {
    let input = sample_pdf(1);
    let config = StampConfig::default();

    let mut without_org = jane_smith(FooterPosition::Bottom);
    without_org.organization = None;
    let mut with_org = without_org.clone();
    with_org.organization = Some("Test Organization".to_string());

    let stamped_without = stamp_pdf(&input, &without_org, &config).unwrap();
    let stamped_with = stamp_pdf(&input, &with_org, &config).unwrap();

    assert!(stamped_with.len() > stamped_without.len());
}

#[test]
fn test_large_licensed_quantity() {
    let input = sample_pdf(1);
    let mut options = jane_smith(FooterPosition::Bottom);
    options.licensed_quantity = 10000;

    let output = stamp_pdf(&input, &options, &StampConfig::default()).unwrap();
    assert!(output.len() > input.len());
}

#[test]
fn test_opacity_reaches_graphics_state() {
    let input = sample_pdf(1);
    let config = StampConfig::default().with_opacity(0.5).unwrap();

    let output = stamp_pdf(&input, &jane_smith(FooterPosition::Diagonal), &config).unwrap();
    let doc = Document::load_mem(&output).unwrap();

    let alpha = doc
        .objects
        .values()
        .find_map(|obj| {
            let dict = obj.as_dict().ok()?;
            match dict.get(b"Type").and_then(|t| t.as_name()) {
                Ok(b"ExtGState") => dict.get(b"ca").ok()?.as_float().ok(),
                _ => None,
            }
        })
        .expect("stamp opacity state");

    // watermark runs at 70% of the footer opacity
    assert!((alpha - 0.35).abs() < 0.001, "got {}", alpha);
}

#[test]
fn test_original_content_kept_and_isolated() {
    let output = stamp_pdf(&sample_pdf(1), &jane_smith(FooterPosition::Bottom), &StampConfig::default())
        .unwrap();
    let mut doc = Document::load_mem(&output).unwrap();
    doc.decompress();

    let page_id = *doc.get_pages().values().next().unwrap();
    let content = String::from_utf8_lossy(&doc.get_page_content(page_id).unwrap()).into_owned();

    assert!(content.starts_with("q\n"));
    assert!(content.contains("(Test PDF Document page 1) Tj"));
    assert!(content.trim_end().ends_with("/LicenseStamp Do\nQ"));

    let page = doc.get_object(page_id).unwrap().as_dict().unwrap();
    let resources = page.get(b"Resources").unwrap().as_dict().unwrap();
    assert!(resources.get(b"Font").unwrap().as_dict().unwrap().has(b"F1"));
    assert!(resources.get(b"XObject").unwrap().as_dict().unwrap().has(b"LicenseStamp"));
}

#[test]
fn test_stamping_twice_keeps_both_stamps() {
    let config = StampConfig::default();
    let once = stamp_pdf(&sample_pdf(1), &jane_smith(FooterPosition::Bottom), &config).unwrap();

    let mut second = jane_smith(FooterPosition::Bottom);
    second.license_id = "second-license".to_string();
    let twice = stamp_pdf(&once, &second, &config).unwrap();

    assert_eq!(count_pages(&twice).unwrap(), 1);
    assert_eq!(stamp_contents(&twice).len(), 2);

    let doc = Document::load_mem(&twice).unwrap();
    let page_id = *doc.get_pages().values().next().unwrap();
    let page = doc.get_object(page_id).unwrap().as_dict().unwrap();
    let xobjects = page
        .get(b"Resources").unwrap().as_dict().unwrap()
        .get(b"XObject").unwrap().as_dict().unwrap();
    assert!(xobjects.has(b"LicenseStamp"));
    assert!(xobjects.has(b"LicenseStamp1"));
}

#[test]
fn test_incrementally_updated_input_is_kept_verbatim() {
    let input = incrementally_updated_pdf();
    let output = stamp_pdf(&input, &jane_smith(FooterPosition::Bottom), &StampConfig::default())
        .expect("Failed to stamp incrementally updated PDF");

    assert!(output.len() >= input.len(), "output {} < input {}", output.len(), input.len());
    assert!(output.starts_with(&input), "input bytes are kept as a prefix");

    let mut doc = Document::load_mem(&output).unwrap();
    doc.decompress();
    let page_id = *doc.get_pages().values().next().unwrap();
    let content = String::from_utf8_lossy(&doc.get_page_content(page_id).unwrap()).into_owned();

    assert!(content.contains("(Second revision) Tj"));
    assert!(!content.contains("First revision"));
    assert!(content.trim_end().ends_with("/LicenseStamp Do\nQ"));
}

#[test]
fn test_inherited_resources_copied_onto_page() {
    let output = stamp_pdf(
        &inherited_resources_pdf(),
        &jane_smith(FooterPosition::Bottom),
        &StampConfig::default(),
    )
    .unwrap();

    let doc = Document::load_mem(&output).unwrap();
    let page_id = *doc.get_pages().values().next().unwrap();
    let page = doc.get_object(page_id).unwrap().as_dict().unwrap();
    let resources = page.get(b"Resources").unwrap().as_dict().unwrap();

    assert!(resources.get(b"Font").unwrap().as_dict().unwrap().has(b"F1"));
    assert!(resources.get(b"XObject").unwrap().as_dict().unwrap().has(b"LicenseStamp"));

    // the A4 MediaBox on the Pages node places the QR code
    let contents = stamp_contents(&output);
    assert!(contents[0].contains("60 0 0 60 515 20 cm"));
}

#[test]
fn test_malformed_input() {
    let result = stamp_pdf(
        b"This is not a PDF document",
        &jane_smith(FooterPosition::Bottom),
        &StampConfig::default(),
    );
    assert!(matches!(result, Err(Error::InputDocument(_))));
}

#[test]
fn test_unencodable_name_fails_whole_call() {
    let mut options = jane_smith(FooterPosition::Bottom);
    options.customer_name = "Antonín Dvořák".to_string();

    let result = stamp_pdf(&sample_pdf(2), &options, &StampConfig::default());
    assert!(matches!(result, Err(Error::ResourceEmbed(_))));
}

#[test]
fn test_oversized_license_id_fails_encoding() {
    let mut options = jane_smith(FooterPosition::Bottom);
    options.license_id = "z".repeat(4000);

    let result = stamp_pdf(&sample_pdf(1), &options, &StampConfig::default());
    assert!(matches!(result, Err(Error::Encoding(_))));
}

#[test]
fn test_stamp_file_round_trip() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let input_path = temp_dir.path().join("score.pdf");
    let output_path = temp_dir.path().join("score-stamped.pdf");
    std::fs::write(&input_path, sample_pdf(2)).unwrap();

    stamp_file(&input_path, &output_path, &jane_smith(FooterPosition::Diagonal), &StampConfig::default())
        .expect("Failed to stamp file");

    assert!(output_path.exists(), "Stamped PDF was not created");
    let output = std::fs::read(&output_path).unwrap();
    assert_eq!(count_pages(&output).unwrap(), 2);
}

#[test]
fn test_stamp_file_missing_input() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let result = stamp_file(
        &temp_dir.path().join("nonexistent.pdf"),
        &temp_dir.path().join("out.pdf"),
        &jane_smith(FooterPosition::Bottom),
        &StampConfig::default(),
    );

    assert!(matches!(result, Err(Error::FileNotFound(_))));
}
