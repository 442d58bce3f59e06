use crate::error::Result;
use crate::xml_out::{Element, XmlNode};
use quick_xml::Writer;
use quick_xml::escape::partial_escape;
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::fs;
use std::io::Write;
use std::path::Path;

/// Render `root` as a UTF-8 document with an XML declaration and two-space
/// indentation. Leaf content is written without added whitespace.
pub fn write_xml<W: Write>(root: &Element, out: W) -> Result<()> {
    let mut writer = Writer::new_with_indent(out, b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    write_element(&mut writer, root)?;
    writer.get_mut().write_all(b"\n")?;
    Ok(())
}

pub fn to_xml_string(root: &Element) -> Result<String> {
    let mut buf = Vec::new();
    write_xml(root, &mut buf)?;
    // only ever written from &str content
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Render and write the whole document in a single call, so a failure while
/// rendering leaves no partial file behind.
pub fn write_xml_file(root: &Element, path: &Path) -> Result<()> {
    let rendered = to_xml_string(root)?;
    fs::write(path, rendered)?;
    Ok(())
}

fn write_element<W: Write>(writer: &mut Writer<W>, el: &Element) -> Result<()> {
    let start = BytesStart::new(el.name.as_str()).with_attributes(
        el.attributes
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str())),
    );

    if el.children.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;
    for child in &el.children {
        match child {
            XmlNode::Element(inner) => write_element(writer, inner)?,
            XmlNode::Text(text) => {
                writer.write_event(Event::Text(BytesText::from_escaped(partial_escape(text))))?;
            }
            XmlNode::CData(raw) => write_cdata(writer, raw)?,
        }
    }
    writer.write_event(Event::End(BytesEnd::new(el.name.as_str())))?;
    Ok(())
}

/// `]]>` cannot appear inside a CDATA section; split the payload there and
/// continue in a second section.
fn write_cdata<W: Write>(writer: &mut Writer<W>, raw: &str) -> Result<()> {
    let mut rest = raw;
    while let Some(pos) = rest.find("]]>") {
        writer.write_event(Event::CData(BytesCData::new(&rest[..pos + 2])))?;
        rest = &rest[pos + 2..];
    }
    writer.write_event(Event::CData(BytesCData::new(rest)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indents_nested_elements_only() {
        let root = Element::new("quiz").with_child(
            Element::new("question")
                .with_attr("type", "category")
                .with_child(Element::text_wrapper("category", "$course$/top/A & B")),
        );
        let xml = to_xml_string(&root).unwrap();
        assert_eq!(
            xml,
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <quiz>\n\
             \x20 <question type=\"category\">\n\
             \x20   <category>\n\
             \x20     <text>$course$/top/A &amp; B</text>\n\
             \x20   </category>\n\
             \x20 </question>\n\
             </quiz>\n"
        );
    }

    #[test]
    fn empty_elements_self_close() {
        let root = Element::new("q").with_child(Element::new("idnumber").with_text(""));
        let xml = to_xml_string(&root).unwrap();
        assert!(xml.contains("\n  <idnumber/>\n"), "{xml}");
    }

    #[test]
    fn cdata_is_written_raw() {
        let root = Element::new("text").with_cdata("<p>a < b && c</p>");
        let xml = to_xml_string(&root).unwrap();
        assert!(xml.ends_with("<text><![CDATA[<p>a < b && c</p>]]></text>\n"), "{xml}");
    }

    #[test]
    fn cdata_terminator_is_split() {
        let root = Element::new("text").with_cdata("x]]>y");
        let xml = to_xml_string(&root).unwrap();
        assert!(xml.contains("<text><![CDATA[x]]]]><![CDATA[>y]]></text>"), "{xml}");
    }

    #[test]
    fn attribute_values_are_escaped() {
        let root = Element::new("a").with_attr("k", "\"<&>\"");
        let xml = to_xml_string(&root).unwrap();
        assert!(xml.contains(r#"<a k="&quot;&lt;&amp;&gt;&quot;"/>"#), "{xml}");
    }

    #[test]
    fn file_output_matches_string_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.xml");
        let root = Element::new("quiz").with_child(Element::text_wrapper("name", "n"));
        write_xml_file(&root, &path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), to_xml_string(&root).unwrap());
    }
}
