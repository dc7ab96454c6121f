/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */

use proc_macro::TokenStream;

use quote::quote;
use syn::{parse_macro_input, ItemFn};

/// Runs an `async fn` test on a fresh multi-thread tokio runtime.
///
/// The body executes inside an `info_span!("hearth_test", name = ...)` so log
/// lines from components spawned by the test can be told apart. Panics raised on
/// any runtime thread are captured with their location and re-raised on the test
/// thread, so a failed assertion inside a component handler fails the test that
/// caused it.
#[proc_macro_attribute]
pub fn hearth_test(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemFn);
    let vis = &input.vis;
    let sig = &input.sig;
    let body = &input.block;
    let attrs = &input.attrs;
    let name = &sig.ident;
    let inputs = &sig.inputs;
    let output = &sig.output;

    let async_name = syn::Ident::new(&format!("__{name}_async"), name.span());

    let expanded = quote! {
        #[test]
        #(#attrs)*
        #vis fn #name() {
            use std::sync::atomic::{AtomicBool, Ordering};
            use std::sync::Arc;
            use std::panic;
            use ::hearth_test::__private::parking_lot::Mutex;

            #[derive(Default)]
            struct CapturedPanic {
                occurred: AtomicBool,
                message: Mutex<Option<String>>,
                location: Mutex<Option<String>>,
            }

            let captured = Arc::new(CapturedPanic::default());
            let hook_capture = Arc::clone(&captured);

            let previous_hook = panic::take_hook();
            panic::set_hook(Box::new(move |info| {
                hook_capture.occurred.store(true, Ordering::SeqCst);
                let payload = info
                    .payload()
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| info.payload().downcast_ref::<String>().cloned());
                *hook_capture.message.lock() = payload;
                *hook_capture.location.lock() = info
                    .location()
                    .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()));
                let message = hook_capture
                    .message
                    .lock()
                    .clone()
                    .unwrap_or_else(|| "no panic message".to_string());
                ::hearth_test::__private::tracing::error!("Panic: {}", message.trim().replace('\n', " "));
                previous_hook(info);
            }));

            let runtime = ::hearth_test::__private::tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .unwrap();

            let result = runtime.block_on(async {
                let test_span = ::hearth_test::__private::tracing::info_span!(
                    "hearth_test",
                    name = stringify!(#name)
                );
                let _enter = test_span.enter();
                #async_name().await
            });
            runtime.shutdown_timeout(std::time::Duration::from_secs(1));

            if captured.occurred.load(Ordering::SeqCst) {
                let message = captured
                    .message
                    .lock()
                    .clone()
                    .unwrap_or_else(|| "no panic message".to_string());
                let location = captured
                    .location
                    .lock()
                    .clone()
                    .unwrap_or_else(|| "unknown location".to_string());
                panic!("Panic at {}: {}", location, message.trim().replace('\n', " "));
            }

            result.unwrap()
        }

        async fn #async_name(#inputs) #output #body
    };

    expanded.into()
}
