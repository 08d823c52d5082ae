use std::fs;
use std::path::{Path, PathBuf};

use tempfile::tempdir;
use transvault::extractor::{
    group_by_namespace, ExtractOptions, Extractor, ExtractorConfig, KeyOccurrence, SortField,
};

fn extractor() -> Extractor {
    Extractor::new(&ExtractorConfig::default()).unwrap()
}

fn keys(occurrences: &[KeyOccurrence]) -> Vec<&str> {
    occurrences.iter().map(|o| o.key.as_str()).collect()
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

#[test]
fn pattern_server_translate_helper() {
    let found = extractor().extract_from_content("__('auth.failed')", "server");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].key, "auth.failed");
    assert_eq!(found[0].line, 1);

    let grouped = group_by_namespace(&found);
    assert!(grouped.contains_key("auth"));
}

#[test]
fn pattern_server_double_quotes_and_whitespace() {
    let found = extractor().extract_from_content("trans( \"validation.required\" , ['attr' => 'x'])", "server");
    assert_eq!(keys(&found), vec!["validation.required"]);
}

#[test]
fn pattern_server_ignores_variables() {
    let found = extractor().extract_from_content("__($key); trans($prefix . '.x');", "server");
    assert!(found.is_empty());
}

#[test]
fn pattern_blade_directive() {
    let found = extractor().extract_from_content("<title>@lang('site.title')</title>", "template");
    assert_eq!(keys(&found), vec!["site.title"]);
    assert_eq!(found[0].pattern, "lang_directive");
}

#[test]
fn pattern_vue_component() {
    let content = "<template>\n  <h1>{{ $t('home.title') }}</h1>\n</template>\n<script>\nexport default { computed: { x() { return this.$t('home.sub') } } }\n</script>\n";
    let found = extractor().extract_from_content(content, "component");
    assert_eq!(keys(&found), vec!["home.title", "home.sub"]);
    assert_eq!(found[0].line, 2);
    assert_eq!(found[1].line, 5);
}

#[test]
fn pattern_script_t_call_at_line_start_and_after_paren() {
    let content = "t('a.first')\nconsole.log(t('a.second'))\n";
    let found = extractor().extract_from_content(content, "script");
    assert_eq!(keys(&found), vec!["a.first", "a.second"]);
    assert_eq!(found[1].line, 2);
}

#[test]
fn file_kind_from_compound_extension() {
    let tmp = tempdir().unwrap();
    // `__(` is matched by both kinds; the directive only by templates
    write(tmp.path(), "views/home.blade.php", "@lang('home.title') {{ __('home.body') }}");

    let found = extractor()
        .extract_from_file(&tmp.path().join("views/home.blade.php"))
        .unwrap();
    assert_eq!(keys(&found), vec!["home.title", "home.body"]);
    assert!(found.iter().all(|o| o.kind == "template"));
    assert!(found[0].file.as_deref().unwrap().ends_with("home.blade.php"));
}

#[test]
fn unknown_extension_is_a_warning() {
    let tmp = tempdir().unwrap();
    write(tmp.path(), "notes.txt", "__('x.y')");
    let err = extractor()
        .extract_from_file(&tmp.path().join("notes.txt"))
        .unwrap_err();
    assert!(err.is_warning());
}

#[test]
fn directory_scan_skips_excluded_segments() {
    let tmp = tempdir().unwrap();
    write(tmp.path(), "app/Http/Controller.php", "__('app.ok');");
    write(tmp.path(), "vendor/pkg/src/Lib.php", "__('vendor.skip');");
    write(tmp.path(), "node_modules/lib/index.js", "t('node.skip');");
    write(tmp.path(), "bootstrap/cache/compiled.php", "__('cache.skip');");
    write(tmp.path(), "resources/js/app.js", "t('js.ok');");

    let report = extractor().extract_from_directory(tmp.path(), true).unwrap();
    assert_eq!(keys(&report.occurrences), vec!["app.ok", "js.ok"]);
    assert_eq!(report.files_scanned, 2);
}

#[test]
fn ignore_globs_skip_files() {
    let tmp = tempdir().unwrap();
    write(tmp.path(), "src/app.js", "t('kept');");
    write(tmp.path(), "src/app.min.js", "t('minified');");

    let mut config = ExtractorConfig::default();
    config.ignore = vec!["**/*.min.js".to_string()];
    let extractor = Extractor::new(&config).unwrap();
    let report = extractor.extract_from_directory(tmp.path(), true).unwrap();
    assert_eq!(keys(&report.occurrences), vec!["kept"]);
}

#[test]
fn extraction_is_deterministic_across_runs() {
    let tmp = tempdir().unwrap();
    for i in 0..40 {
        write(
            tmp.path(),
            &format!("src/mod{:02}/file.js", i),
            &format!("t('group{}.shared');\nt('group{}.own{}');\n", i % 3, i % 5, i),
        );
    }

    let options = ExtractOptions {
        deduplicate: false,
        sort_by: SortField::Key,
        ..ExtractOptions::default()
    };
    let paths = vec![tmp.path().to_path_buf()];
    let first = extractor().extract(&paths, &options);
    let second = extractor().extract(&paths, &options);
    assert_eq!(first.occurrences, second.occurrences);
    assert_eq!(first.occurrences.len(), 80);
}

#[test]
fn missing_paths_are_warnings_not_errors() {
    let tmp = tempdir().unwrap();
    write(tmp.path(), "src/app.js", "t('kept');");

    let paths: Vec<PathBuf> = vec![tmp.path().join("src"), tmp.path().join("does-not-exist")];
    let report = extractor().extract(&paths, &ExtractOptions::default());
    assert_eq!(keys(&report.occurrences), vec!["kept"]);
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].to_string().contains("does-not-exist"));
}

#[test]
fn sort_by_file_then_line_is_stable() {
    let tmp = tempdir().unwrap();
    write(tmp.path(), "b.js", "t('b.one');");
    write(tmp.path(), "a.js", "\n\nt('a.three');\nt('a.four');");

    let options = ExtractOptions {
        sort_by: SortField::File,
        ..ExtractOptions::default()
    };
    let report = extractor().extract(&[tmp.path().to_path_buf()], &options);
    assert_eq!(keys(&report.occurrences), vec!["a.three", "a.four", "b.one"]);

    let options = ExtractOptions {
        sort_by: SortField::Line,
        ..ExtractOptions::default()
    };
    let report = extractor().extract(&[tmp.path().to_path_buf()], &options);
    assert_eq!(keys(&report.occurrences), vec!["b.one", "a.three", "a.four"]);
}
