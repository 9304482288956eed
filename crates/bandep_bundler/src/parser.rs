use anyhow::{Context, Result};
use dashmap::DashMap;
use log::{debug, trace};
use oxc_allocator::Allocator;
use oxc_ast::ast::*;
use oxc_parser::{Parser as OxcParser, ParserReturn};
use oxc_span::SourceType;
use std::{
    fs,
    path::{Path, PathBuf},
};

use bandep_plugin::ImportKind;

use crate::types::Specifier;

/// All module requests made by `file`: static imports, re-exports with a
/// source, dynamic `import()`, and `require()` calls. Parsed once per file
/// per build via `cache`.
pub fn imports_for(
    file: &Path,
    cache: &DashMap<PathBuf, Vec<Specifier>>,
) -> Result<Vec<Specifier>> {
    let key = file.to_path_buf();
    if let Some(cached) = cache.get(&key) {
        trace!("Cache hit for imports: {}", file.display());
        return Ok(cached.clone());
    }

    let src =
        fs::read_to_string(file).with_context(|| format!("Failed to read {}", file.display()))?;
    trace!("Parsing {} ({} bytes)", file.display(), src.len());

    let allocator = Allocator::default();
    let ParserReturn { program, .. } =
        OxcParser::new(&allocator, &src, source_type_for(file)).parse();

    let mut specs: Vec<Specifier> = Vec::new();
    for stmt in &program.body {
        match stmt {
            Statement::ImportDeclaration(decl) => {
                // `import type { Foo } from 'bar'` never reaches the bundle.
                if decl.import_kind.is_type() {
                    trace!("Skipping type-only import in {}", file.display());
                    continue;
                }
                if has_runtime_binding(decl) {
                    push_request(&mut specs, &decl.source.value, ImportKind::Static);
                }
            }
            Statement::ExportNamedDeclaration(decl) => {
                // `export { x } from './mod'` pulls the source in like an
                // import does.
                if !decl.export_kind.is_type()
                    && let Some(source) = &decl.source
                {
                    push_request(&mut specs, &source.value, ImportKind::Static);
                }
            }
            Statement::ExportAllDeclaration(decl) => {
                if !decl.export_kind.is_type() {
                    push_request(&mut specs, &decl.source.value, ImportKind::Static);
                }
            }
            Statement::ExpressionStatement(es) => {
                collect_call_requests(&es.expression, &mut specs);
            }
            Statement::VariableDeclaration(decl) => {
                for declarator in &decl.declarations {
                    if let Some(init) = &declarator.init {
                        collect_call_requests(init, &mut specs);
                    }
                }
            }
            _ => {}
        }
    }

    debug!("Found {} import specifiers in {}", specs.len(), file.display());
    cache.insert(key, specs.clone());
    Ok(specs)
}

fn push_request(specs: &mut Vec<Specifier>, request: &str, kind: ImportKind) {
    trace!("Found {:?} request: '{}'", kind, request);
    specs.push(Specifier { request: request.to_string(), kind });
}

/// `import { type Foo, bar } from 'mod'` still binds `bar` at runtime; only
/// a declaration whose specifiers are all type-only can be dropped.
fn has_runtime_binding(decl: &ImportDeclaration) -> bool {
    match &decl.specifiers {
        Some(specifiers) => specifiers.iter().any(|spec| match spec {
            ImportDeclarationSpecifier::ImportSpecifier(s) => !s.import_kind.is_type(),
            ImportDeclarationSpecifier::ImportDefaultSpecifier(_) => true,
            ImportDeclarationSpecifier::ImportNamespaceSpecifier(_) => true,
        }),
        // Bare `import './side-effect'`.
        None => true,
    }
}

/// Walk an expression for `require('...')` and `import('...')` calls with
/// string-literal arguments.
fn collect_call_requests(expr: &Expression, specs: &mut Vec<Specifier>) {
    match expr {
        Expression::CallExpression(call) => {
            if let Expression::Identifier(callee) = &call.callee
                && callee.name.as_str() == "require"
                && !call.arguments.is_empty()
                && let Some(Expression::StringLiteral(lit)) = call.arguments[0].as_expression()
            {
                push_request(specs, &lit.value, ImportKind::Static);
            }
            for arg in &call.arguments {
                if let Some(arg_expr) = arg.as_expression() {
                    collect_call_requests(arg_expr, specs);
                }
            }
            collect_call_requests(&call.callee, specs);
        }
        Expression::ImportExpression(import) => {
            if let Expression::StringLiteral(lit) = &import.source {
                push_request(specs, &lit.value, ImportKind::Dynamic);
            }
        }
        Expression::ArrayExpression(array) => {
            for element in &array.elements {
                if let Some(element_expr) = element.as_expression() {
                    collect_call_requests(element_expr, specs);
                }
            }
        }
        Expression::ObjectExpression(object) => {
            for prop in &object.properties {
                if let Some(prop) = prop.as_property() {
                    collect_call_requests(&prop.value, specs);
                }
            }
        }
        Expression::ConditionalExpression(cond) => {
            collect_call_requests(&cond.test, specs);
            collect_call_requests(&cond.consequent, specs);
            collect_call_requests(&cond.alternate, specs);
        }
        Expression::AssignmentExpression(assign) => {
            collect_call_requests(&assign.right, specs);
        }
        Expression::ParenthesizedExpression(paren) => {
            collect_call_requests(&paren.expression, specs);
        }
        _ => {}
    }
}

fn source_type_for(path: &Path) -> SourceType {
    let ext = path.extension().and_then(|e| e.to_str());

    let mut st = SourceType::default()
        .with_jsx(matches!(ext, Some("tsx") | Some("jsx")))
        .with_typescript(matches!(ext, Some("ts") | Some("tsx") | Some("mts") | Some("cts")));

    if matches!(ext, Some("mjs") | Some("mts")) {
        st = st.with_module(true);
    }

    st
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;
    use tempfile::TempDir;

    fn create_test_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let file_path = dir.join(name);
        fs::write(&file_path, content).expect("Failed to write test file");
        file_path
    }

    fn parse(name: &str, content: &str) -> Vec<Specifier> {
        let temp_dir = TempDir::new().unwrap();
        let cache = DashMap::new();
        let file = create_test_file(temp_dir.path(), name, content);
        imports_for(&file, &cache).unwrap()
    }

    #[test]
    fn test_static_imports() {
        let specs = parse(
            "test.js",
            "import foo from './foo';\nimport { bar } from 'bar-pkg';\nimport './side-effect';",
        );
        let requests: Vec<&str> = specs.iter().map(|s| s.request.as_str()).collect();
        assert_eq!(requests, vec!["./foo", "bar-pkg", "./side-effect"]);
        assert!(specs.iter().all(|s| s.kind == ImportKind::Static));
    }

    #[test]
    fn test_reexports_count_as_imports() {
        let specs = parse(
            "test.js",
            "export { helper } from './helpers';\nexport * from 'moment';\nexport const x = 1;",
        );
        let requests: Vec<&str> = specs.iter().map(|s| s.request.as_str()).collect();
        assert_eq!(requests, vec!["./helpers", "moment"]);
    }

    #[test]
    fn test_type_only_imports_and_reexports_skipped() {
        let specs = parse(
            "test.ts",
            "import type { Foo } from './types';\nexport type { Bar } from './more-types';",
        );
        assert!(specs.is_empty());
    }

    #[test]
    fn test_mixed_type_and_runtime_import_kept() {
        let specs = parse("test.ts", "import { type Foo, bar } from './utils';");
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].request, "./utils");
    }

    #[test]
    fn test_dynamic_import() {
        let specs = parse("test.js", "import('./lazy');");
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].request, "./lazy");
        assert_eq!(specs[0].kind, ImportKind::Dynamic);
    }

    #[test]
    fn test_require_calls() {
        let specs = parse(
            "test.js",
            "const fs = require('fs');\nconst cfg = load(require('./config'));",
        );
        let requests: Vec<&str> = specs.iter().map(|s| s.request.as_str()).collect();
        assert_eq!(requests, vec!["fs", "./config"]);
    }

    #[test]
    fn test_require_in_conditional_and_array() {
        let specs = parse(
            "test.js",
            "const mods = [require('./a'), flag ? require('./b') : require('./c')];",
        );
        let requests: Vec<&str> = specs.iter().map(|s| s.request.as_str()).collect();
        assert_eq!(requests, vec!["./a", "./b", "./c"]);
    }

    #[test]
    fn test_no_imports() {
        assert!(parse("test.js", "const x = 42;").is_empty());
    }

    #[test]
    fn test_typescript_and_jsx_sources() {
        assert_eq!(parse("test.ts", "import { C } from './c';").len(), 1);
        assert_eq!(parse("test.jsx", "import React from 'react';").len(), 1);
        assert_eq!(parse("test.tsx", "import React from 'react';").len(), 1);
    }

    #[test]
    fn test_parse_cache_is_reused() {
        let temp_dir = TempDir::new().unwrap();
        let cache = DashMap::new();
        let file = create_test_file(temp_dir.path(), "test.js", "import foo from './foo';");

        let first = imports_for(&file, &cache).unwrap();
        // Rewrite the file; the cached parse must still be served.
        fs::write(&file, "import bar from './bar';").unwrap();
        let second = imports_for(&file, &cache).unwrap();

        assert_eq!(first[0].request, second[0].request);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let cache = DashMap::new();
        assert!(imports_for(&temp_dir.path().join("gone.js"), &cache).is_err());
    }
}
