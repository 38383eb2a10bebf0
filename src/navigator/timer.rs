use std::time::Duration;

use futures::future::LocalBoxFuture;

/// Source of suspensions for polling loops.
pub trait Timer {
	fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()>;
}

/// `setTimeout` wrapped in a promise.
///
/// Dropping the sleep before it fires clears the timeout.
#[derive(Clone, Copy, Debug, Default)]
pub struct BrowserTimer;

struct ScheduledTimeout(Option<i32>);

impl Drop for ScheduledTimeout {
	fn drop(&mut self) {
		if let (Some(handle), Some(window)) = (self.0.take(), web_sys::window()) {
			window.clear_timeout_with_handle(handle);
		}
	}
}

impl Timer for BrowserTimer {
	fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()> {
		let millis = i32::try_from(duration.as_millis()).unwrap_or(i32::MAX);
		let mut handle = None;
		let promise = js_sys::Promise::new(&mut |resolve, _reject| {
			let scheduled = web_sys::window().map(|window| {
				window.set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, millis)
			});
			match scheduled {
				Some(Ok(id)) => handle = Some(id),
				// no timer available: resolve now rather than hang
				_ => {
					let _ = resolve.call0(&wasm_bindgen::JsValue::NULL);
				}
			}
		});
		let mut scheduled = ScheduledTimeout(handle);
		Box::pin(async move {
			let _ = wasm_bindgen_futures::JsFuture::from(promise).await;
			// fired; nothing left to clear
			scheduled.0 = None;
		})
	}
}
