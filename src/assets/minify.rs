// src/assets/minify.rs

//! In-process minification: oxc for the script bundle, lightningcss for
//! style sheets.

use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet};
use oxc::allocator::Allocator;
use oxc::codegen::{Codegen, CodegenOptions, CommentOptions};
use oxc::mangler::MangleOptions;
use oxc::minifier::{CompressOptions, Minifier, MinifierOptions};
use oxc::parser::Parser;
use oxc::span::SourceType;

/// Minify a script bundle.
///
/// The bundle is parsed as a classic script: its top-level names are globals
/// that pages may reference, so they are never mangled. Returns the parser's
/// first diagnostic on failure.
pub fn minify_js(source: &str) -> Result<String, String> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, SourceType::cjs()).parse();
    if let Some(err) = ret.errors.first() {
        return Err(err.to_string());
    }
    let mut program = ret.program;
    let options = MinifierOptions {
        mangle: Some(MangleOptions::default()),
        compress: Some(CompressOptions::smallest()),
    };
    let ret = Minifier::new(options).minify(&allocator, &mut program);
    let code = Codegen::new()
        .with_options(CodegenOptions {
            minify: true,
            comments: CommentOptions::disabled(),
            ..CodegenOptions::default()
        })
        .with_scoping(ret.scoping)
        .build(&program)
        .code;
    Ok(code)
}

/// Compress a style sheet.
pub fn minify_css(source: &str) -> Result<String, String> {
    let stylesheet =
        StyleSheet::parse(source, ParserOptions::default()).map_err(|e| e.to_string())?;
    let result = stylesheet
        .to_css(PrinterOptions {
            minify: true,
            ..PrinterOptions::default()
        })
        .map_err(|e| e.to_string())?;
    Ok(result.code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn js_minification_drops_whitespace_and_comments() {
        let src = "// greeting\nfunction greet(name) {\n  return 'hi ' + name;\n}\n";
        let out = minify_js(src).unwrap();
        assert!(out.len() < src.len());
        assert!(!out.contains("greeting"));
        assert!(out.contains("greet"));
    }

    #[test]
    fn js_syntax_error_is_reported() {
        assert!(minify_js("function (").is_err());
    }

    #[test]
    fn css_is_compressed() {
        let out = minify_css("body {\n  color: #ff0000;\n}\n").unwrap();
        assert!(!out.contains('\n'));
        assert!(out.starts_with("body{"));
    }
}
