mod helpers;

use mnemos::config::MnemosConfig;
use mnemos::context::AppContext;
use mnemos::memory::sqlite::SqliteBackend;
use mnemos::memory::Strata;
use mnemos::tools::ToolType;
use tempfile::TempDir;

fn context(tool_dir: &std::path::Path) -> AppContext {
    let mut config = MnemosConfig::default();
    config.tools.dirs = vec![tool_dir.to_string_lossy().into_owned()];
    AppContext::with_backend(config, Box::new(SqliteBackend::new(helpers::test_db()))).unwrap()
}

#[test]
fn remember_classifies_strata_when_not_given() {
    let tmp = TempDir::new().unwrap();
    let mut ctx = context(tmp.path());

    ctx.remember(helpers::node("/principles/symmetry", &[], Strata::Cognitive), None)
        .unwrap();
    ctx.remember(helpers::node("/journal/today", &["disk", "io"], Strata::Cognitive), None)
        .unwrap();
    ctx.remember(helpers::node("/journal/idea", &["plan"], Strata::Somatic), None)
        .unwrap();
    ctx.remember(
        helpers::node("/journal/override", &["disk"], Strata::Cognitive),
        Some(Strata::Other("oneiric".into())),
    )
    .unwrap();

    let strata_of = |path: &str| ctx.engine.get_memory_node(path).unwrap().unwrap().strata;
    assert_eq!(strata_of("/principles/symmetry"), Strata::Metaphysical);
    assert_eq!(strata_of("/journal/today"), Strata::Somatic);
    assert_eq!(strata_of("/journal/idea"), Strata::Cognitive);
    assert_eq!(strata_of("/journal/override"), Strata::Other("oneiric".into()));
}

#[test]
fn indexed_tools_are_queryable_through_the_context() {
    let tmp = TempDir::new().unwrap();
    helpers::write_file(
        tmp.path(),
        "regex.luciform",
        &helpers::tool_document("regex_search_file", "divination", "search files with a regex", &["regex"], "intermediaire"),
    );
    let mut ctx = context(tmp.path());

    let report = ctx.index_tools(false).unwrap();
    assert_eq!(report.indexed, 1);

    let found = ctx.registry.find_tools_by_type(&ctx.engine, ToolType::Divination);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].source_path.as_deref(), Some(tmp.path().join("regex.luciform").to_string_lossy().as_ref()));

    let node = ctx
        .engine
        .get_memory_node("/tools/divination/regex_search_file")
        .unwrap()
        .unwrap();
    assert_eq!(node.strata, Strata::Cognitive);
    assert_eq!(node.summary, "search files with a regex");
}
