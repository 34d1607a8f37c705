use std::collections::HashSet;

use gsmparam::collection::ParameterCollection;
use gsmparam::datatype::ParameterType;
use gsmparam::library::{LibraryPart, PartRegistry};
use gsmparam::node::parse_document;
use gsmparam::parameter::Parameter;
use pretty_assertions::assert_eq;

const SYMBOL: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Symbol IsArchivable="false" IsPlaceable="true" MainGUID="6C1A9B1E-0000-4B5D-9E00-3C4D5E6F7A8B" Owner="0" Signature="0" Version="46">
	<CalledMacros SectVersion="1" SectionFlags="0" SubIdent="0">
		<Macro>
			<MName><![CDATA["frame_macro"]]></MName>
		</Macro>
	</CalledMacros>
	<Script_3D SectVersion="20" SectionFlags="0" SubIdent="0"><![CDATA[
BLOCK A, B, zHeight
CALL "frame_macro" PARAMETERS ALL
]]></Script_3D>
	<ParamSection SectVersion="27" SectionFlags="0" SubIdent="0">
		<ParamSectHeader/>
		<Parameters>
			<Length Name="A"><Description><![CDATA[""]]></Description><Value>1</Value></Length>
			<Length Name="zHeight"><Description><![CDATA[""]]></Description><Value>2</Value></Length>
			<Length Name="xFrame"><Description><![CDATA[""]]></Description><Value>0.1</Value></Length>
			<Angle Name="aUnused"><Description><![CDATA[""]]></Description><Value>0</Value></Angle>
		</Parameters>
	</ParamSection>
</Symbol>
"#;

fn with_parameters(names: &[&str]) -> ParameterCollection {
    let mut parameters = ParameterCollection::new();
    for name in names {
        parameters.append(Parameter::new(ParameterType::Length, *name)).expect("unique names");
    }
    parameters
}

#[test]
fn library_part_documents_are_read() {
    let root = parse_document(SYMBOL).expect("well-formed symbol");
    let part = LibraryPart::from_node("Window Frame", &root).expect("valid part");
    assert_eq!(part.guid(), Some("6C1A9B1E-0000-4B5D-9E00-3C4D5E6F7A8B"));
    assert_eq!(part.called_macros(), ["frame_macro".to_string()]);
    let scripts: Vec<&str> = part.scripts().map(|(kind, _)| kind).collect();
    assert_eq!(scripts, vec!["Script_3D"]);
    assert_eq!(part.parameters().len(), 4);
}

#[test]
fn parts_without_a_section_are_rejected() {
    let root = parse_document("<Symbol><Script_3D/></Symbol>").unwrap();
    assert!(LibraryPart::from_node("empty", &root).is_err());
}

#[test]
fn usage_follows_called_macros() {
    let root = parse_document(SYMBOL).unwrap();
    let part = LibraryPart::from_node("Window Frame", &root).unwrap();
    let frame_macro = LibraryPart::new("Frame_Macro").with_script("Script_3D", "PRISM_ 4, xFrame");
    let mut registry = PartRegistry::new();
    registry.register(part.clone());
    registry.register(frame_macro);

    assert!(part.is_referenced("zHeight", &registry, &mut HashSet::default()));
    assert!(part.is_referenced("xFrame", &registry, &mut HashSet::default()));
    assert!(!part.is_referenced("aUnused", &registry, &mut HashSet::default()));
    assert_eq!(part.unused_parameters(&registry), vec!["aUnused"]);
}

#[test]
fn unknown_macros_are_skipped() {
    let part = LibraryPart::new("door")
        .with_script("Script_2D", "PROJECT2 3, 270, 2")
        .with_called_macro("missing_macro")
        .with_parameters(with_parameters(&["xWidth"]));
    let registry = PartRegistry::new();
    assert_eq!(part.unused_parameters(&registry), vec!["xWidth"]);
}

#[test]
fn call_cycles_terminate() {
    let first = LibraryPart::new("first")
        .with_called_macro("second")
        .with_parameters(with_parameters(&["xDeep", "xNowhere"]));
    let second = LibraryPart::new("second").with_called_macro("third");
    let third = LibraryPart::new("third")
        .with_script("Script_3D", "BLOCK xDeep, 1, 1")
        .with_called_macro("FIRST");
    let mut registry = PartRegistry::new();
    for part in [first.clone(), second, third] {
        registry.register(part);
    }
    assert_eq!(registry.len(), 3);
    assert!(registry.lookup("Second").is_some());

    let mut visited = HashSet::default();
    assert!(!first.is_referenced("xNowhere", &registry, &mut visited));
    assert_eq!(visited.len(), 3);
    assert_eq!(first.unused_parameters(&registry), vec!["xNowhere"]);
}
