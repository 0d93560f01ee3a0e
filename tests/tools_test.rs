mod helpers;

use std::collections::BTreeSet;

use mnemos::tools::{ToolLevel, ToolMetadata, ToolQuery, ToolRegistry, ToolType};
use tempfile::TempDir;

fn tool(id: &str, ty: ToolType, intent: &str, keywords: &[&str], level: Option<ToolLevel>) -> ToolMetadata {
    let mut meta = ToolMetadata::new(id, ty, intent);
    meta.keywords = keywords.iter().map(|k| k.to_string()).collect();
    meta.level = level;
    meta
}

fn ids(tools: &[ToolMetadata]) -> Vec<&str> {
    tools.iter().map(|t| t.tool_id.as_str()).collect()
}

#[test]
fn type_lookup_returns_all_and_keyword_lookup_only_tagged() {
    let mut engine = helpers::sqlite_engine();
    let mut registry = helpers::registry_for(&[]);
    registry
        .register_tool(&mut engine, tool("regex_search_file", ToolType::Divination, "search with regex", &["regex"], None))
        .unwrap();
    registry
        .register_tool(&mut engine, tool("list_omens", ToolType::Divination, "list warnings", &["warnings"], None))
        .unwrap();

    let by_type = registry.find_tools_by_type(&engine, ToolType::Divination);
    assert_eq!(ids(&by_type), vec!["list_omens", "regex_search_file"]);

    let by_keyword = registry.find_tools_by_keyword(&engine, "regex");
    assert_eq!(ids(&by_keyword), vec!["regex_search_file"]);

    // keyword lookup is case-insensitive
    assert_eq!(ids(&registry.find_tools_by_keyword(&engine, "REGEX")), vec!["regex_search_file"]);
}

#[test]
fn indexing_skips_documents_without_a_type() {
    let tmp = TempDir::new().unwrap();
    helpers::write_file(
        tmp.path(),
        "good.luciform",
        &helpers::tool_document("read_file", "scrying", "read a file", &["read"], "fondamental"),
    );
    helpers::write_file(
        tmp.path(),
        "nested/typeless.luciform",
        &helpers::tool_document("mystery", "", "does something", &["odd"], "avance"),
    );
    helpers::write_file(tmp.path(), "notes.txt", "not a tool document");

    let mut engine = helpers::sqlite_engine();
    let mut registry = helpers::registry_for(&[tmp.path()]);
    let report = registry.index_all_tools(&mut engine, false).unwrap();

    assert_eq!(report.scanned_files, 2);
    assert_eq!(report.indexed, 1);
    assert_eq!(report.invalid.len(), 1);
    assert!(report.invalid[0].path.ends_with("typeless.luciform"));
    assert_eq!(report.total_tools, 1);
    assert!(registry.get_tool("read_file").is_some());
    assert!(registry.get_tool("mystery").is_none());
}

#[test]
fn invalid_records_never_reach_search_results() {
    let tmp = TempDir::new().unwrap();
    helpers::write_file(
        tmp.path(),
        "valid.luciform",
        &helpers::tool_document("scan_dir", "revelation", "list a directory tree", &["tree"], "fondamental"),
    );
    helpers::write_file(
        tmp.path(),
        "bad_type.luciform",
        &helpers::tool_document("bad_type_tool", "necromancy", "list a directory tree", &["tree"], "fondamental"),
    );
    helpers::write_file(
        tmp.path(),
        "no_id.luciform",
        "<luciform>\n  <pacte><type>revelation</type><intent>list a directory tree</intent></pacte>\n</luciform>\n",
    );

    let mut engine = helpers::sqlite_engine();
    let mut registry = helpers::registry_for(&[tmp.path()]);
    let report = registry.index_all_tools(&mut engine, false).unwrap();
    assert_eq!(report.indexed, 1);
    assert_eq!(report.invalid.len(), 2);

    let queries = [
        ToolQuery::new(),
        ToolQuery {
            keyword: Some("tree".into()),
            ..ToolQuery::new()
        },
        ToolQuery {
            tool_type: Some(ToolType::Revelation),
            ..ToolQuery::new()
        },
        ToolQuery {
            intent: Some("directory tree".into()),
            level: Some(ToolLevel::Fondamental),
            ..ToolQuery::new()
        },
    ];
    for query in &queries {
        assert_eq!(ids(&registry.search_tools(&engine, query)), vec!["scan_dir"], "{query:?}");
    }
}

#[test]
fn type_and_level_search_is_the_intersection() {
    let mut engine = helpers::sqlite_engine();
    let mut registry = helpers::registry_for(&[]);
    let tools = [
        tool("a", ToolType::Divination, "", &[], Some(ToolLevel::Fondamental)),
        tool("b", ToolType::Divination, "", &[], Some(ToolLevel::Avance)),
        tool("c", ToolType::Scrying, "", &[], Some(ToolLevel::Fondamental)),
        tool("d", ToolType::Divination, "", &[], Some(ToolLevel::Fondamental)),
        tool("e", ToolType::Divination, "", &[], None),
    ];
    for t in tools {
        registry.register_tool(&mut engine, t).unwrap();
    }

    for ty in [ToolType::Divination, ToolType::Scrying, ToolType::Memory] {
        for level in [ToolLevel::Fondamental, ToolLevel::Intermediaire, ToolLevel::Avance] {
            let by_type: BTreeSet<String> = registry
                .find_tools_by_type(&engine, ty)
                .into_iter()
                .map(|t| t.tool_id)
                .collect();
            let by_level: BTreeSet<String> = registry
                .find_tools_by_level(&engine, level)
                .into_iter()
                .map(|t| t.tool_id)
                .collect();
            let expected: BTreeSet<String> = by_type.intersection(&by_level).cloned().collect();

            let query = ToolQuery {
                tool_type: Some(ty),
                level: Some(level),
                limit: 0,
                ..ToolQuery::new()
            };
            let got: BTreeSet<String> = registry
                .search_tools(&engine, &query)
                .into_iter()
                .map(|t| t.tool_id)
                .collect();
            assert_eq!(got, expected, "{ty} / {level}");
        }
    }
}

#[test]
fn intent_search_requires_every_query_word() {
    let mut engine = helpers::sqlite_engine();
    let mut registry = helpers::registry_for(&[]);
    registry
        .register_tool(&mut engine, tool("regex_tool", ToolType::Divination, "regex pattern matching", &[], None))
        .unwrap();
    registry
        .register_tool(&mut engine, tool("algo_tool", ToolType::Augury, "matching algorithms", &[], None))
        .unwrap();

    let query = ToolQuery {
        intent: Some("pattern matching".into()),
        ..ToolQuery::new()
    };
    assert_eq!(ids(&registry.search_tools(&engine, &query)), vec!["regex_tool"]);

    let scored = registry.find_tools_by_intent("matching");
    assert_eq!(scored.len(), 2);
    assert!(scored.iter().all(|s| s.score == 2));
}

#[test]
fn intent_ranking_orders_by_score() {
    let mut engine = helpers::sqlite_engine();
    let mut registry = helpers::registry_for(&[]);
    let mut usage_only = tool("usage_only", ToolType::Scrying, "inspect bytes", &[], None);
    usage_only.usage_context = Some("when reading files".into());
    registry.register_tool(&mut engine, usage_only).unwrap();
    registry
        .register_tool(&mut engine, tool("intent_and_kw", ToolType::Scrying, "reading files", &["reading"], None))
        .unwrap();

    let scored = registry.find_tools_by_intent("reading");
    let order: Vec<(&str, u32)> = scored.iter().map(|s| (s.tool.tool_id.as_str(), s.score)).collect();
    assert_eq!(order, vec![("intent_and_kw", 3), ("usage_only", 1)]);
}

#[test]
fn search_respects_limit() {
    let mut engine = helpers::sqlite_engine();
    let mut registry = helpers::registry_for(&[]);
    for i in 0..5 {
        registry
            .register_tool(&mut engine, tool(&format!("t{i}"), ToolType::Memory, "remember", &[], None))
            .unwrap();
    }
    let query = ToolQuery {
        tool_type: Some(ToolType::Memory),
        limit: 3,
        ..ToolQuery::new()
    };
    assert_eq!(registry.search_tools(&engine, &query).len(), 3);
    assert_eq!(registry.search_tools(&engine, &ToolQuery { limit: 0, ..ToolQuery::new() }).len(), 5);
}

#[test]
fn second_index_pass_is_a_no_op_unless_forced() {
    let tmp = TempDir::new().unwrap();
    helpers::write_file(
        tmp.path(),
        "a.luciform",
        &helpers::tool_document("first_tool", "inscription", "write a file", &["write"], "intermediaire"),
    );

    let mut engine = helpers::sqlite_engine();
    let mut registry = helpers::registry_for(&[tmp.path()]);
    let first = registry.index_all_tools(&mut engine, false).unwrap();
    assert!(!first.already_indexed);

    helpers::write_file(
        tmp.path(),
        "b.luciform",
        &helpers::tool_document("second_tool", "inscription", "append to a file", &["append"], "intermediaire"),
    );

    let second = registry.index_all_tools(&mut engine, false).unwrap();
    assert!(second.already_indexed);
    assert_eq!(second.total_tools, 1);
    assert!(registry.get_tool("second_tool").is_none());

    let forced = registry.index_all_tools(&mut engine, true).unwrap();
    assert!(!forced.already_indexed);
    assert_eq!(forced.total_tools, 2);
}

#[test]
fn unregister_removes_node_and_cache_entry() {
    let mut engine = helpers::sqlite_engine();
    let mut registry = helpers::registry_for(&[]);
    let path = registry
        .register_tool(&mut engine, tool("purge_tmp", ToolType::Purification, "delete temp files", &["cleanup"], None))
        .unwrap();
    assert_eq!(path, "/tools/purification/purge_tmp");
    assert!(engine.contains(&path));

    assert!(registry.unregister_tool(&mut engine, "purge_tmp").unwrap());
    assert!(!engine.contains(&path));
    assert!(registry.get_tool("purge_tmp").is_none());
    assert!(registry.find_tools_by_keyword(&engine, "cleanup").is_empty());

    assert!(!registry.unregister_tool(&mut engine, "purge_tmp").unwrap());
}

#[test]
fn re_registering_under_a_new_type_moves_the_node() {
    let mut engine = helpers::sqlite_engine();
    let mut registry = helpers::registry_for(&[]);
    registry
        .register_tool(&mut engine, tool("shifter", ToolType::Scrying, "read", &[], None))
        .unwrap();
    registry
        .register_tool(&mut engine, tool("shifter", ToolType::Transmutation, "rewrite", &[], None))
        .unwrap();

    assert!(!engine.contains("/tools/scrying/shifter"));
    assert!(engine.contains("/tools/transmutation/shifter"));
    assert!(registry.find_tools_by_type(&engine, ToolType::Scrying).is_empty());
    assert_eq!(registry.list_tools().len(), 1);
}

#[test]
fn stored_tools_are_hydrated_by_a_new_registry() {
    let tmp = TempDir::new().unwrap();
    {
        let mut engine = helpers::fs_engine(tmp.path());
        let mut registry = helpers::registry_for(&[]);
        registry
            .register_tool(&mut engine, tool("keeper", ToolType::Protection, "back up files", &["backup"], Some(ToolLevel::Avance)))
            .unwrap();
    }

    let engine = helpers::fs_engine(tmp.path());
    let mut registry: ToolRegistry = helpers::registry_for(&[]);
    assert_eq!(registry.hydrate(&engine).unwrap(), 1);

    let stats = registry.tool_stats();
    assert_eq!(stats.total_tools, 1);
    assert_eq!(stats.by_type.get("protection"), Some(&1));
    assert_eq!(stats.by_level.get("avance"), Some(&1));
    assert_eq!(ids(&registry.find_tools_by_keyword(&engine, "backup")), vec!["keeper"]);
}

#[test]
fn regex_fallback_reads_documents_the_parser_rejects() {
    let tmp = TempDir::new().unwrap();
    // unclosed <essence> breaks the structured parse
    helpers::write_file(
        tmp.path(),
        "broken.luciform",
        r#"<luciform id="sloppy_luciform">
  <pacte><type>augury</type><intent>diagnose & report</intent><level>avancé</level></pacte>
  <essence><keywords><keyword>diagnose</keyword></keywords>
</luciform>
"#,
    );

    let mut engine = helpers::sqlite_engine();
    let mut registry = helpers::registry_for(&[tmp.path()]);
    let report = registry.index_all_tools(&mut engine, false).unwrap();
    assert_eq!(report.indexed, 1);

    let meta = registry.get_tool("sloppy").unwrap();
    assert_eq!(meta.tool_type, ToolType::Augury);
    assert_eq!(meta.level, Some(ToolLevel::Avance));
    assert_eq!(meta.keywords, vec!["diagnose".to_string()]);
}
