use gsmparam::GsmParamError;
use gsmparam::collection::ParameterCollection;
use gsmparam::datatype::{ParameterType, RawValue, Scalar};
use gsmparam::directive::{Cell, Engine};
use gsmparam::error::Warning;
use gsmparam::parameter::{Parameter, ParameterFlag};
use gsmparam::settings::Settings;
use pretty_assertions::assert_eq;

const BANNER: &str = " Frame: PARAMETER BLOCK ===== PARAMETER BLOCK ===== PARAMETER BLOCK ===== PARAMETER BLOCK ";

fn run(collection: &mut ParameterCollection, cells: &[Cell]) -> Vec<Warning> {
    let mut engine = Engine::new(collection);
    let mut warnings = Vec::new();
    for cell in cells {
        warnings.extend(engine.execute(cell).expect("directive applies"));
    }
    warnings
}

fn names(collection: &ParameterCollection) -> Vec<&str> {
    collection.iter().map(Parameter::name).collect()
}

fn frame_sheet() -> Vec<Cell> {
    vec![
        Cell::new("Frame -t Title -b -d Frame", ""),
        Cell::new("xWidth -t Length -c Frame -d Overall width", "1.2"),
        Cell::new("isOpen -d Open", "1"),
    ]
}

#[test]
fn running_a_sheet_twice_changes_nothing() {
    let mut parameters = ParameterCollection::new();
    run(&mut parameters, &frame_sheet());
    let first = parameters.clone();
    assert_eq!(names(&parameters), vec![BANNER, "Frame", "xWidth", "isOpen"]);

    run(&mut parameters, &frame_sheet());
    assert_eq!(parameters, first);
    assert_eq!(parameters.to_node().to_xml(), first.to_node().to_xml());
}

#[test]
fn created_parameters_carry_type_flags_and_value() {
    let mut parameters = ParameterCollection::new();
    run(&mut parameters, &frame_sheet());
    let title = parameters.by_name("Frame").unwrap();
    assert_eq!(title.kind(), ParameterType::Title);
    assert!(title.has_flag(ParameterFlag::BoldName));
    assert!(title.value().is_none());

    let width = parameters.by_name("xWidth").unwrap();
    assert!(width.has_flag(ParameterFlag::Child));
    assert_eq!(width.description(), "Overall width");
    assert_eq!(width.scalar(), Some(&Scalar::Float(1.2)));

    let open = parameters.by_name("isOpen").unwrap();
    assert_eq!(open.kind(), ParameterType::Boolean);
    assert_eq!(open.scalar(), Some(&Scalar::Boolean(true)));
}

#[test]
fn types_are_inferred_from_names() {
    let mut parameters = ParameterCollection::new();
    let warnings = run(
        &mut parameters,
        &[
            Cell::new("nCount", "3"),
            Cell::new("aRotation", "90"),
            Cell::new("sLabel", "\"Door\""),
            Cell::new("zHeight", "2.1"),
            Cell::new("Widget", "plain"),
        ],
    );
    let kinds: Vec<ParameterType> = parameters.iter().map(Parameter::kind).collect();
    assert_eq!(
        kinds,
        vec![
            ParameterType::Integer,
            ParameterType::Angle,
            ParameterType::String,
            ParameterType::Length,
            ParameterType::String,
        ]
    );
    assert_eq!(parameters.by_name("sLabel").unwrap().scalar(), Some(&Scalar::from("Door")));
    assert_eq!(warnings, vec![Warning::InferredFallback { name: "Widget".to_string() }]);
}

#[test]
fn children_stay_together_under_their_title() {
    let mut parameters = ParameterCollection::new();
    run(
        &mut parameters,
        &[
            Cell::new("Frame -t Title", ""),
            Cell::new("Other -t Title", ""),
            Cell::new("xWidth -c Frame", "1"),
            Cell::new("xDepth -c Frame", "2"),
        ],
    );
    let children: Vec<&str> = parameters
        .children_of("Frame")
        .unwrap()
        .into_iter()
        .map(Parameter::name)
        .collect();
    assert_eq!(children, vec!["xWidth", "xDepth"]);
    assert_eq!(parameters.next_after("xDepth").map(Parameter::is_comment), Some(true));
}

#[test]
fn relative_placement_joins_a_child_run() {
    let mut parameters = ParameterCollection::new();
    run(&mut parameters, &frame_sheet());
    run(
        &mut parameters,
        &[Cell::new("xDepth -a Frame", "0.5"), Cell::new("xInset -f xWidth", "0.1")],
    );
    assert_eq!(names(&parameters), vec![BANNER, "Frame", "xDepth", "xInset", "xWidth", "isOpen"]);
    assert!(parameters.by_name("xDepth").unwrap().has_flag(ParameterFlag::Child));
    assert!(parameters.by_name("xInset").unwrap().has_flag(ParameterFlag::Child));
    assert!(!parameters.by_name("isOpen").unwrap().has_flag(ParameterFlag::Child));
}

#[test]
fn inheriting_after_a_bold_title_makes_a_child() {
    let mut parameters = ParameterCollection::new();
    run(
        &mut parameters,
        &[
            Cell::new("Frame -t Title -b", ""),
            Cell::new("xHidden -t Length -h", "1"),
            Cell::new("xWidth -a Frame -i", "1"),
            Cell::new("xOther -f xHidden -i", "2"),
        ],
    );
    assert!(parameters.by_name("xWidth").unwrap().has_flag(ParameterFlag::Child));
    assert!(parameters.by_name("xOther").unwrap().has_flag(ParameterFlag::Hidden));

    let mut engine = Engine::new(&mut parameters);
    let error = engine.execute(&Cell::new("xLost -i", "1")).unwrap_err();
    assert!(matches!(error.root(), GsmParamError::AmbiguousDirective(_)));
}

#[test]
fn inheriting_from_the_title_keeps_the_child_run_intact() {
    let mut parameters = ParameterCollection::new();
    run(
        &mut parameters,
        &[
            Cell::new("Frame -t Title -b", ""),
            Cell::new("xA -c Frame", "1"),
            Cell::new("xB -c Frame -i", "2"),
            Cell::new("xC -c Frame", "3"),
        ],
    );
    let children: Vec<&str> = parameters
        .children_of("Frame")
        .expect("Frame is a title")
        .into_iter()
        .map(Parameter::name)
        .collect();
    assert_eq!(children, vec!["xA", "xB", "xC"]);
    assert!(parameters.by_name("xB").unwrap().has_flag(ParameterFlag::Child));
}

#[test]
fn banner_comments_are_placed_once() {
    let mut parameters = ParameterCollection::new();
    run(
        &mut parameters,
        &[
            Cell::new("xWidth", "1"),
            Cell::new("Extras -t Comment", ""),
            Cell::new("Extras -t Comment", ""),
            Cell::new("Frame -t Comment -f xWidth", ""),
        ],
    );
    let comments = parameters.iter().filter(|p| p.is_comment()).count();
    assert_eq!(comments, 2);
    assert_eq!(parameters.by_index(0).map(Parameter::name), Some(BANNER));

    // a Title does not repeat an existing banner either
    run(&mut parameters, &[Cell::new("Frame -t Title -a xWidth", "")]);
    assert_eq!(parameters.iter().filter(|p| p.name() == BANNER).count(), 1);
    assert_eq!(parameters.position("Frame"), Some(2));
}

#[test]
fn removal_needs_a_confirming_cell() {
    let mut parameters = ParameterCollection::new();
    run(&mut parameters, &frame_sheet());
    run(
        &mut parameters,
        &[Cell::new("xWidth -r", ""), Cell::new("isOpen -r", "0")],
    );
    assert!(parameters.contains("xWidth") && parameters.contains("isOpen"));

    run(
        &mut parameters,
        &[Cell::new("xWidth -r", "x"), Cell::new("xNever -r", "1")],
    );
    assert!(!parameters.contains("xWidth"));
    assert!(!parameters.contains("xNever"));
}

#[test]
fn indexed_writes_grow_arrays() {
    let mut parameters = ParameterCollection::new();
    run(
        &mut parameters,
        &[
            Cell::new("xList -t Length -1 3", "2.5"),
            Cell::new("xList -1 1", "1"),
            Cell::new("nGrid -t Integer -1 2 -2 3", "7"),
        ],
    );
    let list = parameters.by_name("xList").unwrap();
    assert_eq!(list.array().unwrap().first_dimension(), 3);
    assert_eq!(list.value_by_path("1").unwrap(), Some(&Scalar::Float(1.0)));
    assert_eq!(list.value_by_path("2").unwrap(), None);
    assert_eq!(list.value_by_path("3").unwrap(), Some(&Scalar::Float(2.5)));

    let grid = parameters.by_name("nGrid").unwrap().array().unwrap();
    assert_eq!((grid.first_dimension(), grid.second_dimension()), (2, 3));
    assert_eq!(grid.cell(2, 3), Some(&Scalar::Integer(7)));
}

#[test]
fn indexing_a_scalar_warns() {
    let mut parameters = ParameterCollection::new();
    run(&mut parameters, &frame_sheet());
    let warnings = run(&mut parameters, &[Cell::new("xWidth -1 2", "5")]);
    assert_eq!(warnings, vec![Warning::ScalarToArray { name: "xWidth".to_string() }]);
    assert!(parameters.by_name("xWidth").unwrap().array().is_some());
}

#[test]
fn errors_name_the_cell_they_came_from() {
    let mut parameters = ParameterCollection::new();
    let mut engine = Engine::new(&mut parameters);
    let error = engine.execute(&Cell::new("xList -2 3", "1").at(4, 2)).unwrap_err();
    match &error {
        GsmParamError::Directive { location, .. } => {
            assert_eq!((location.row, location.column), (Some(4), Some(2)));
            assert_eq!(location.name, "xList");
        }
        other => panic!("expected a located error, got {:?}", other),
    }
    assert!(matches!(error.root(), GsmParamError::AmbiguousDirective(_)));
    assert!(engine.collection().is_empty());
}

#[test]
fn a_failing_directive_does_not_stop_the_batch() {
    let mut parameters = ParameterCollection::new();
    let cells = vec![
        Cell::new("xA -a Nowhere", "1"),
        Cell::new("xB", "2"),
        Cell::new("xC -t Volume", "3"),
    ];
    let report = Engine::new(&mut parameters).execute_all(&cells);
    assert_eq!(report.applied, 1);
    assert_eq!(report.failures.len(), 2);
    assert!(matches!(report.failures[0].root(), GsmParamError::MissingReferencedParameter(name) if name == "Nowhere"));
    assert!(matches!(report.failures[1].root(), GsmParamError::UnknownParameterType(_)));
    assert_eq!(names(&parameters), vec!["xB"]);
}

#[test]
fn children_of_a_non_title_are_refused() {
    let mut parameters = ParameterCollection::new();
    run(&mut parameters, &frame_sheet());
    let warnings = run(&mut parameters, &[Cell::new("xInner -c xWidth", "1")]);
    assert_eq!(warnings, vec![Warning::ChildTargetNotTitle { target: "xWidth".to_string() }]);
    assert!(!parameters.contains("xInner"));

    let strict = Settings {
        strict_child_target: true,
        ..Default::default()
    };
    let mut engine = Engine::with_settings(&mut parameters, strict);
    let error = engine.execute(&Cell::new("xInner -c xWidth", "1")).unwrap_err();
    assert!(matches!(error.root(), GsmParamError::AmbiguousDirective(_)));
}

#[test]
fn bad_values_leave_the_collection_untouched() {
    let mut parameters = ParameterCollection::new();
    run(&mut parameters, &[Cell::new("nCount", "3")]);
    let before = parameters.clone();
    let mut engine = Engine::new(&mut parameters);
    for cell in [
        Cell::new("nOther -t Integer", "many"),
        Cell::new("nCount", "many"),
        Cell::new("nCount -1 2", "many"),
        Cell::new("nCount -d Changed", RawValue::Mapping(vec![("a".to_string(), RawValue::from("1"))])),
    ] {
        let error = engine.execute(&cell).unwrap_err();
        assert!(matches!(
            error.root(),
            GsmParamError::TypeCoercion { .. } | GsmParamError::UnsupportedOperation(_)
        ));
    }
    assert_eq!(parameters, before);
    assert_eq!(parameters.by_name("nCount").unwrap().description(), "");
}

#[test]
fn tables_fill_whole_arrays() {
    let mut parameters = ParameterCollection::new();
    let table = |rows: Vec<Vec<&str>>| -> Vec<Vec<String>> {
        rows.into_iter().map(|row| row.into_iter().map(str::to_string).collect()).collect()
    };
    run(
        &mut parameters,
        &[
            Cell::new("xGrid -t Length", "").with_table(table(vec![vec!["1", "2"], vec!["3", "4"]])),
            Cell::new("aSteps", "").with_table(table(vec![vec!["0"], vec!["45"], vec!["90"]])),
        ],
    );
    let grid = parameters.by_name("xGrid").unwrap().array().unwrap();
    assert!(grid.is_two_dimensional());
    assert_eq!(grid.cell(2, 1), Some(&Scalar::Float(3.0)));
    let steps = parameters.by_name("aSteps").unwrap().array().unwrap();
    assert!(!steps.is_two_dimensional());
    assert_eq!(steps.first_dimension(), 3);
}

#[test]
fn long_names_are_truncated_consistently() {
    let long = "xAVeryLongParameterNameThatKeepsGoing";
    let mut parameters = ParameterCollection::new();
    run(&mut parameters, &[Cell::new(long, "1"), Cell::new(long, "2")]);
    assert_eq!(parameters.len(), 1);
    let kept = parameters.iter().next().unwrap();
    assert_eq!(kept.name().chars().count(), 32);
    assert_eq!(kept.scalar(), Some(&Scalar::Float(2.0)));
}

#[test]
fn updates_change_descriptions_and_skip_blank_dictionaries() {
    let mut parameters = ParameterCollection::new();
    run(
        &mut parameters,
        &[
            Cell::new("xWidth -d Width", "1"),
            Cell::new("xWidth -d Clear width", "1"),
            Cell::new("dData -t Dictionary", ""),
            Cell::new("dData", " "),
        ],
    );
    assert_eq!(parameters.by_name("xWidth").unwrap().description(), "Clear width");
    let data = parameters.by_name("dData").unwrap();
    assert_eq!(data.kind(), ParameterType::Dictionary);
    assert!(data.payload().is_none());
}

#[test]
fn unknown_tokens_are_reported_not_fatal() {
    let mut parameters = ParameterCollection::new();
    let warnings = run(&mut parameters, &[Cell::new("xWidth -z -o", "1")]);
    assert_eq!(warnings, vec![Warning::IgnoredToken { token: "-z".to_string() }]);
    assert!(parameters.contains("xWidth"));
}
