use proc_macro::TokenStream;
use syn::parse_macro_input;

mod test_generator;

/// Emits one `#[test]` per `.txt` trace in the given directory. Each test calls
/// `run_trace_case(path)`, which must be in scope at the call site.
#[proc_macro]
pub fn generate_trace_tests(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input);
    test_generator::test_generator_impl(input).into()
}
