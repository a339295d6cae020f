use std::path::{Path, PathBuf};

use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::LitStr;

fn is_trace_file(path: &Path) -> bool {
    path.is_file() && path.extension().is_some_and(|ext| ext == "txt")
}

pub fn test_generator_impl(input: TokenStream) -> TokenStream {
    let input: LitStr = match syn::parse2(input) {
        Ok(lit) => lit,
        Err(err) => return err.to_compile_error(),
    };

    // Relative paths resolve against the crate invoking the macro.
    let root = std::env::var("CARGO_MANIFEST_DIR")
        .map(PathBuf::from)
        .unwrap_or_default();
    let dir = root.join(input.value());

    let entries = match std::fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(err) => {
            let msg = format!("cannot read trace directory {}: {}", dir.display(), err);
            return syn::Error::new(input.span(), msg).to_compile_error();
        }
    };

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| is_trace_file(p))
        .collect();
    paths.sort();

    let tokens = paths.iter().map(|path| {
        let file_name = path
            .file_stem()
            .map(|s| s.to_string_lossy().replace(['.', '-'], "_"))
            .unwrap_or_default();
        let test_name = format_ident!("trace_{}", file_name);
        let path_str = path.to_string_lossy().into_owned();
        quote! {
            #[test]
            fn #test_name() {
                run_trace_case(#path_str)
            }
        }
    });

    quote! {
        #(#tokens)*
    }
}
