use std::cell::{Cell, RefCell};
use std::rc::Rc;

use leptos::callback::{Callable, UnsyncCallback};
use leptos::prelude::*;
use send_wrapper::SendWrapper;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, MouseEvent, WheelEvent, Window};

use super::engine::CanvasEngine;
use super::render;
use crate::graph::{GraphData, GraphNode};

type FrameClosure = Rc<RefCell<Option<Closure<dyn FnMut()>>>>;

fn viewport_size(window: &Window) -> Option<(f64, f64)> {
	Some((
		window.inner_width().ok()?.as_f64()?,
		window.inner_height().ok()?.as_f64()?,
	))
}

fn local_point(canvas: &HtmlCanvasElement, ev: &MouseEvent) -> (f64, f64) {
	let rect = canvas.get_bounding_client_rect();
	(
		ev.client_x() as f64 - rect.left(),
		ev.client_y() as f64 - rect.top(),
	)
}

/// Force-directed canvas for one level of the navigator.
///
/// `engine` is shared with the caller so it can read node positions and move
/// the camera. Node clicks (press and release without dragging) are reported
/// through `on_node_click`.
#[component]
pub fn ForceGraphCanvas(
	#[prop(into)] data: Signal<GraphData>,
	engine: CanvasEngine,
	#[prop(into)] selected: Signal<Option<String>>,
	on_node_click: UnsyncCallback<GraphNode>,
	#[prop(default = false)] fullscreen: bool,
	#[prop(default = None)] width: Option<f64>,
	#[prop(default = None)] height: Option<f64>,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let animate: FrameClosure = Rc::new(RefCell::new(None));
	let resize_cb: FrameClosure = Rc::new(RefCell::new(None));
	let frame_id: Rc<Cell<Option<i32>>> = Rc::new(Cell::new(None));
	let mounted: Rc<RefCell<Option<HtmlCanvasElement>>> = Rc::new(RefCell::new(None));

	let (engine_init, animate_init, resize_cb_init, frame_init, mounted_init) = (
		engine.clone(),
		animate.clone(),
		resize_cb.clone(),
		frame_id.clone(),
		mounted.clone(),
	);
	Effect::new(move |_| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		if mounted_init.borrow().is_some() {
			return;
		}
		let canvas: HtmlCanvasElement = canvas.into();
		let Some(window) = web_sys::window() else {
			return;
		};

		let (w, h) = if fullscreen {
			viewport_size(&window).unwrap_or((800.0, 600.0))
		} else {
			(
				width.unwrap_or_else(|| {
					canvas
						.parent_element()
						.map(|p| p.client_width() as f64)
						.unwrap_or(800.0)
				}),
				height.unwrap_or_else(|| {
					canvas
						.parent_element()
						.map(|p| p.client_height() as f64)
						.unwrap_or(600.0)
				}),
			)
		};
		canvas.set_width(w as u32);
		canvas.set_height(h as u32);

		let ctx: CanvasRenderingContext2d = match canvas.get_context("2d") {
			Ok(Some(ctx)) => match ctx.dyn_into() {
				Ok(ctx) => ctx,
				Err(_) => return,
			},
			_ => {
				log::error!("canvas has no 2d context");
				return;
			}
		};
		engine_init.state().borrow_mut().resize(w, h);
		*mounted_init.borrow_mut() = Some(canvas.clone());

		if fullscreen {
			let (engine_resize, canvas_resize) = (engine_init.clone(), canvas.clone());
			*resize_cb_init.borrow_mut() = Some(Closure::new(move || {
				let Some((nw, nh)) = web_sys::window().as_ref().and_then(viewport_size) else {
					return;
				};
				canvas_resize.set_width(nw as u32);
				canvas_resize.set_height(nh as u32);
				if let Ok(mut s) = engine_resize.state().try_borrow_mut() {
					s.resize(nw, nh);
				}
			}));
			if let Some(ref cb) = *resize_cb_init.borrow() {
				let _ =
					window.add_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
			}
		}

		let (engine_anim, animate_inner, frame_anim) =
			(engine_init.clone(), animate_init.clone(), frame_init.clone());
		*animate_init.borrow_mut() = Some(Closure::new(move || {
			if let Ok(mut s) = engine_anim.state().try_borrow_mut() {
				if !s.animation_running {
					frame_anim.set(None);
					return;
				}
				s.tick(0.016);
				render::render(&s, &ctx);
			}
			if let (Some(cb), Some(win)) = (animate_inner.borrow().as_ref(), web_sys::window()) {
				frame_anim.set(win.request_animation_frame(cb.as_ref().unchecked_ref()).ok());
			}
		}));
		if let Some(ref cb) = *animate_init.borrow() {
			frame_init.set(window.request_animation_frame(cb.as_ref().unchecked_ref()).ok());
		}
	});

	let engine_data = engine.clone();
	Effect::new(move |_| {
		let data = data.get();
		engine_data.set_data(&data);
	});

	let engine_sel = engine.clone();
	Effect::new(move |_| {
		engine_sel.set_selected(selected.get());
	});

	// Stop the frame loop, unhook listeners, drop the simulation and give
	// the canvas backing store back.
	let engine_cleanup = engine.clone();
	let teardown = SendWrapper::new(move || {
		let window = web_sys::window();
		if let (Some(win), Some(id)) = (window.as_ref(), frame_id.take()) {
			let _ = win.cancel_animation_frame(id);
		}
		if let (Some(win), Some(cb)) = (window.as_ref(), resize_cb.borrow_mut().take()) {
			let _ = win.remove_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
		}
		animate.borrow_mut().take();
		engine_cleanup.release();
		if let Some(canvas) = mounted.borrow_mut().take() {
			canvas.set_width(0);
			canvas.set_height(0);
		}
		log::debug!("graph canvas released");
	});
	on_cleanup(move || (teardown.take())());

	let engine_md = engine.clone();
	let on_mousedown = move |ev: MouseEvent| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let (x, y) = local_point(&canvas, &ev);
		if let Ok(mut s) = engine_md.state().try_borrow_mut() {
			s.press(x, y);
		}
	};

	let engine_mm = engine.clone();
	let on_mousemove = move |ev: MouseEvent| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let (x, y) = local_point(&canvas, &ev);
		if let Ok(mut s) = engine_mm.state().try_borrow_mut() {
			s.pointer_move(x, y);
		}
	};

	let engine_mu = engine.clone();
	let on_mouseup = move |_: MouseEvent| {
		let clicked = match engine_mu.state().try_borrow_mut() {
			Ok(mut s) => s.release_pointer(),
			Err(_) => None,
		};
		// the borrow is released: the handler may read positions or move the camera
		if let Some(node) = clicked {
			on_node_click.run(node);
		}
	};

	let engine_ml = engine.clone();
	let on_mouseleave = move |_: MouseEvent| {
		if let Ok(mut s) = engine_ml.state().try_borrow_mut() {
			s.leave();
		}
	};

	let engine_wh = engine.clone();
	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let (x, y) = local_point(&canvas, &ev);
		if let Ok(mut s) = engine_wh.state().try_borrow_mut() {
			s.zoom_at(x, y, ev.delta_y() < 0.0);
		}
	};

	view! {
		<canvas
			node_ref=canvas_ref
			class="force-graph-canvas"
			on:mousedown=on_mousedown
			on:mousemove=on_mousemove
			on:mouseup=on_mouseup
			on:mouseleave=on_mouseleave
			on:wheel=on_wheel
			style="display: block; cursor: grab;"
		/>
	}
}
