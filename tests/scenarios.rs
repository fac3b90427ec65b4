//! End-to-end scenarios exercising the extraction -> parsing -> indexing ->
//! reference-tracking pipeline on inline fixtures, without a running LSP
//! connection.

use tower_lsp::lsp_types::Url;
use vbs_lsp::asp;
use vbs_lsp::graph::IncludeGraph;
use vbs_lsp::include;
use vbs_lsp::index::SymbolIndex;
use vbs_lsp::parser::{self, SymbolKind};
use vbs_lsp::position::Position;
use vbs_lsp::refs::ReferenceTracker;

fn url(s: &str) -> Url {
    Url::parse(s).unwrap()
}

#[test]
fn scenario_simple_function_symbol_and_selection_range() {
    let text = "Public Function AddNumbers(a, b)\n    AddNumbers = a + b\nEnd Function\n";
    let symbols = parser::parse_fragment(text);

    assert_eq!(symbols.len(), 1);
    let add_numbers = &symbols[0];
    assert_eq!(add_numbers.name, "AddNumbers");
    assert_eq!(add_numbers.kind, SymbolKind::Function);
    assert_eq!(add_numbers.selection_range.start, Position::new(0, 16));
    assert_eq!(add_numbers.selection_range.end, Position::new(0, 26));
}

#[test]
fn scenario_class_with_nested_sub_definition_lookup() {
    let text = "Class Calculator\n  Public Sub Add(v)\n    m_Result = m_Result + v\n  End Sub\nEnd Class\n";
    let symbols = parser::parse_fragment(text);
    let uri = url("file:///calc.vbs");

    let mut index = SymbolIndex::new();
    index.update(uri.clone(), &symbols, text.to_string());

    let definitions = index.find_definitions("add");
    assert_eq!(definitions.len(), 1);
    assert_eq!(definitions[0].container_name.as_deref(), Some("Calculator"));

    let class_definitions = index.find_definitions("calculator");
    assert_eq!(class_definitions.len(), 1);
    assert_eq!(class_definitions[0].kind, SymbolKind::Class);
}

#[test]
fn scenario_asp_fragment_offsets_preserve_file_position() {
    let text = "<html>\n<body>\n<% Function Greet(name)\n  Greet = \"Hello \" & name\nEnd Function %>\n</body>\n</html>";
    let blocks = asp::extract_blocks(text);
    assert_eq!(blocks.len(), 1);

    let symbols: Vec<_> = parser::parse_fragment(&blocks[0].content)
        .into_iter()
        .map(|s| s.offset_by(blocks[0].start))
        .collect();

    assert_eq!(symbols.len(), 1);
    assert_eq!(symbols[0].name, "Greet");
    // The function keyword sits on file line 2 (0-indexed), not fragment line 0.
    assert_eq!(symbols[0].range.start.line, 2);
}

#[test]
fn scenario_cross_file_include_definition_lookup() {
    let lib_text = "Function Helper()\n  Helper = 42\nEnd Function\n";
    let page_text = "<!--#include file=\"lib.inc\"-->\n<% Helper() %>";

    let lib_uri = url("file:///ws/lib.inc");
    let page_uri = url("file:///ws/index.asp");

    let mut index = SymbolIndex::new();
    index.update(lib_uri.clone(), &parser::parse_fragment(lib_text), lib_text.to_string());

    let mut graph = IncludeGraph::new();
    let directives = include::find_includes(
        page_text,
        &std::path::PathBuf::from("/ws/index.asp"),
        Some(std::path::Path::new("/ws")),
    );
    let targets: Vec<Url> = directives
        .iter()
        .filter_map(|d| d.resolved.as_ref())
        .filter_map(|p| Url::from_file_path(p).ok())
        .collect();
    graph.update(page_uri.clone(), targets);

    // lib.inc is lazily loaded only once reached through the include graph.
    let reachable = graph.transitive_includes(&page_uri);
    assert_eq!(reachable, vec![lib_uri.clone()]);

    let definitions = index.find_definitions("helper");
    assert_eq!(definitions.len(), 1);
    assert_eq!(definitions[0].uri, lib_uri);
}

#[test]
fn scenario_workspace_wide_references_exclude_string_and_comment() {
    let uri = url("file:///a.vbs");
    let text = "Function Add(a, b)\n  Add = a + b ' Add again\nEnd Function\nx = \"Add\"\nAdd(1, 2)";

    let symbols = parser::parse_fragment(text);
    let mut index = SymbolIndex::new();
    index.update(uri.clone(), &symbols, text.to_string());

    let names = index.all_names();
    let mut tracker = ReferenceTracker::new();
    tracker.update(uri.clone(), text, &names, &index);

    let refs = tracker.find_references("add", true);
    // Declaration + body assignment target + the final call: three live-code
    // occurrences. The comment and the string literal are excluded.
    assert_eq!(refs.len(), 3);
}

#[test]
fn scenario_include_cycle_has_no_infinite_loop() {
    let a_uri = url("file:///a.asp");
    let b_uri = url("file:///b.asp");

    let mut graph = IncludeGraph::new();
    graph.update(a_uri.clone(), vec![b_uri.clone()]);
    graph.update(b_uri.clone(), vec![a_uri.clone()]);

    let reachable_from_a = graph.transitive_includes(&a_uri);
    assert_eq!(reachable_from_a.len(), 1);
    assert_eq!(reachable_from_a[0], b_uri);
    assert!(graph.has_cycle(&a_uri));
}
