use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{parse_macro_input, spanned::Spanned, FnArg, Ident, ItemFn, Pat, Signature, Type};

/// Turn a function into a registry unit test, initialise logging, and inject
/// dependencies.
///
/// Injectable dependencies are [`crate::model::Registry`] and
/// [`crate::model::Commission`], both belonging to one freshly created registry.
/// Passing `seeded` as the attribute argument pre-populates the registry with
/// two candidates (John, id 0 and Doe, id 1) and two voters (Alice and Bob),
/// none of whom have voted yet.
#[proc_macro_attribute]
pub fn registry_test(args: TokenStream, input: TokenStream) -> TokenStream {
    let mut item_fn = parse_macro_input!(input as ItemFn);

    // Extract the injected arguments and reject invalid function signatures.
    let test_args = match check_sig(item_fn.sig.clone()) {
        Ok(args) => args,
        Err(err) => {
            return err.into_compile_error().into();
        }
    };

    // Rename the body so the test can have its original name.
    let name = item_fn.sig.ident.clone();
    let new_name = format_ident!("{}_body", name);
    item_fn.sig.ident = new_name.clone();

    // Seed the registry if asked to.
    let maybe_seed = match parse_macro_input!(args as Option<Ident>) {
        Some(arg) if arg == "seeded" => quote! {
            crate::model::Registry::seed_example(&mut registry, &commission);
        },
        Some(arg) => {
            return syn::Error::new(arg.span(), "Expected no argument or `seeded`")
                .into_compile_error()
                .into();
        }
        None => TokenStream2::new(),
    };

    // Rewrite the test function.
    quote! {
        #[test]
        fn #name() {
            log4rs_test_utils::test_logging::init_logging_once_for(
                ["election_registry"],
                None,
                None,
            );

            /// The test itself.
            #item_fn

            #[allow(unused_variables, unused_mut)]
            let (mut registry, commission) =
                crate::model::Registry::create(crate::model::Address::example_commission());

            #maybe_seed

            #new_name(#(#test_args),*);
        }
    }
    .into()
}

/// Ensure the wrapped test is synchronous, extract parameters to inject, and reject unknown parameters.
fn check_sig(sig: Signature) -> Result<Vec<TokenStream2>, syn::Error> {
    if sig.asyncness.is_some() {
        return Err(syn::Error::new(
            sig.span(),
            "Registry tests are synchronous; remove `async`",
        ));
    }

    let mut has_registry = false;
    let mut has_commission = false;
    let mut args = vec![];

    for input in &sig.inputs {
        if let FnArg::Typed(pat_type) = input {
            if let Pat::Ident(_) = &*pat_type.pat {
                if let Type::Path(type_path) = &*pat_type.ty {
                    // Valid as the last path segment for any type is itself
                    let type_ident = &type_path.path.segments.last().unwrap().ident;
                    if type_ident == "Registry" {
                        if has_registry {
                            return Err(syn::Error::new(
                                input.span(),
                                "Test cannot accept more than one `Registry`",
                            ));
                        }
                        has_registry = true;
                        args.push(quote! { registry });
                        continue;
                    } else if type_ident == "Commission" {
                        if has_commission {
                            return Err(syn::Error::new(
                                input.span(),
                                "Test cannot accept more than one `Commission`",
                            ));
                        }
                        has_commission = true;
                        args.push(quote! { commission });
                        continue;
                    }
                }
            }
        }

        return Err(syn::Error::new(
            input.span(),
            "Expected one of `registry_ident: Registry` or `commission_ident: Commission`",
        ));
    }

    Ok(args)
}
