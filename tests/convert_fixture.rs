use std::fs;
use std::path::PathBuf;

use roxmltree::Document;
use swad2prado::mapping::resolve;
use swad2prado::{ConvertOptions, Mapping, convert_file, convert_str};

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn fixture(name: &str) -> String {
    fs::read_to_string(fixture_path(name)).expect("failed to read fixture")
}

const CATEGORY: &str = "$course$/top/Banco importado desde SWAD (CI) — ñ & <b>";

fn convert_with(mapping: &Mapping) -> String {
    let options = ConvertOptions::new(CATEGORY);
    convert_str(&fixture("swad.xml"), mapping, &options)
        .expect("convert failed")
        .xml
}

fn fractions(question: roxmltree::Node) -> Vec<String> {
    question
        .children()
        .filter(|n| n.has_tag_name("answer"))
        .map(|a| a.attribute("fraction").unwrap_or_default().to_string())
        .collect()
}

fn child_text(node: roxmltree::Node, path: &[&str]) -> String {
    let mut current = node;
    for name in path {
        current = current
            .children()
            .find(|n| n.has_tag_name(*name))
            .unwrap_or_else(|| panic!("missing <{name}>"));
    }
    current.text().unwrap_or_default().to_string()
}

#[test]
fn one_entry_per_question_plus_category() {
    let xml = convert_with(&Mapping::default());
    let doc = Document::parse(&xml).expect("output is well-formed");

    let source = fixture("swad.xml");
    let input = Document::parse(&source).unwrap();
    let input_questions = input
        .descendants()
        .filter(|n| n.has_tag_name("question"))
        .count();

    let entries: Vec<_> = doc.root_element().children().filter(|n| n.is_element()).collect();
    let categories = entries
        .iter()
        .filter(|n| n.attribute("type") == Some("category"))
        .count();
    let multichoice = entries
        .iter()
        .filter(|n| n.attribute("type") == Some("multichoice"))
        .count();

    assert_eq!(categories, 1);
    assert_eq!(multichoice, input_questions);
    assert_eq!(entries[0].attribute("type"), Some("category"));
}

#[test]
fn category_is_copied_verbatim() {
    let xml = convert_with(&Mapping::default());
    let doc = Document::parse(&xml).unwrap();
    let category = doc
        .descendants()
        .find(|n| n.attribute("type") == Some("category"))
        .unwrap();
    assert_eq!(child_text(category, &["category", "text"]), CATEGORY);
}

#[test]
fn bodies_are_unescaped_cdata() {
    let xml = convert_with(&Mapping::default());
    assert!(xml.contains(
        "<text><![CDATA[<p>¿Cuál es la capital de Francia?</p>]]></text>"
    ));
    assert!(xml.contains(
        "<text><![CDATA[<p>Selecciona los números primos (2 < x && x < 6)</p>]]></text>"
    ));
    assert_eq!(xml.matches("<![CDATA[").count(), 3);
}

#[test]
fn fractions_and_single_flag() {
    let xml = convert_with(&Mapping::default());
    let doc = Document::parse(&xml).unwrap();
    let questions: Vec<_> = doc
        .root_element()
        .children()
        .filter(|n| n.attribute("type") == Some("multichoice"))
        .collect();

    assert_eq!(fractions(questions[0]), vec!["100", "-25", "-25", "-25"]);
    assert_eq!(child_text(questions[0], &["single"]), "true");

    assert_eq!(fractions(questions[1]), vec!["50", "50"]);
    assert_eq!(child_text(questions[1], &["single"]), "false");

    // "Sí" is one of the default true values
    assert_eq!(fractions(questions[2]), vec!["100", "-25"]);
    assert_eq!(child_text(questions[2], &["shuffleanswers"]), "true");
}

#[test]
fn override_file_enables_feedback() {
    let mapping = resolve(Some(fixture_path("mapping.json").as_path())).expect("mapping loads");
    let defaults = Mapping::default();
    assert_eq!(mapping.question_xpath, "//question");
    assert_eq!(mapping.title, defaults.title);
    assert_eq!(mapping.answer_list, defaults.answer_list);
    assert_eq!(mapping.true_values, defaults.true_values);

    let xml = convert_with(&mapping);
    let doc = Document::parse(&xml).unwrap();
    let first = doc
        .root_element()
        .children()
        .find(|n| n.attribute("type") == Some("multichoice"))
        .unwrap();

    assert_eq!(
        child_text(first, &["generalfeedback", "text"]),
        "París es la capital desde el siglo X."
    );
    let answer_feedback: Vec<String> = first
        .children()
        .filter(|n| n.has_tag_name("answer"))
        .map(|a| child_text(a, &["feedback", "text"]))
        .collect();
    assert_eq!(
        answer_feedback,
        vec!["Correcto", "Es la tercera ciudad", "", ""]
    );
}

#[test]
fn conversion_is_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("first.xml");
    let second = dir.path().join("second.xml");
    let mapping = Mapping::default();
    let options = ConvertOptions::new(CATEGORY);

    convert_file(&fixture_path("swad.xml"), &first, &mapping, &options).unwrap();
    convert_file(&fixture_path("swad.xml"), &second, &mapping, &options).unwrap();

    assert_eq!(fs::read(&first).unwrap(), fs::read(&second).unwrap());
}
