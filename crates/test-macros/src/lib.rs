//! Test attribute macros shared across the workspace.

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, ItemFn, LitInt};

/// Replacement for `#[test]` that reports wall-clock time and fails tests
/// that run past a deadline (default: 5 seconds).
///
/// ```ignore
/// #[timed_test]
/// fn quick() { assert!(true); }
///
/// #[timed_test(120)]
/// fn slow_convergence() { /* gets a 120 second deadline */ }
/// ```
#[proc_macro_attribute]
pub fn timed_test(attr: TokenStream, item: TokenStream) -> TokenStream {
    let deadline_secs: u64 = if attr.is_empty() {
        5
    } else {
        parse_macro_input!(attr as LitInt)
            .base10_parse()
            .expect("timed_test deadline must be an integer number of seconds")
    };

    let func = parse_macro_input!(item as ItemFn);
    let name = &func.sig.ident;
    let body = &func.block;
    let attrs = &func.attrs;
    let vis = &func.vis;

    quote! {
        #(#attrs)*
        #[test]
        #vis fn #name() {
            let __start = ::std::time::Instant::now();
            let __outcome = ::std::panic::catch_unwind(::std::panic::AssertUnwindSafe(|| #body));
            let __secs = __start.elapsed().as_secs_f64();

            eprintln!("[timed] {}: {:.3}s", stringify!(#name), __secs);

            match __outcome {
                Err(payload) => ::std::panic::resume_unwind(payload),
                Ok(()) => assert!(
                    __secs < #deadline_secs as f64,
                    "{} blew its {}s deadline ({:.3}s)",
                    stringify!(#name),
                    #deadline_secs,
                    __secs,
                ),
            }
        }
    }
    .into()
}
