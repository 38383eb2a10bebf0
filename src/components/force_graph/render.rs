use std::collections::HashMap;
use std::f64::consts::PI;

use force_graph::DefaultNodeIdx;
use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

use super::state::{ForceGraphState, NodeInfo, ease_out_cubic};
use crate::graph::LevelTag;

const BACKGROUND: &str = "#1a1a2e";
const SELECTED_RING: &str = "#ffd166";

/// Stroke colour (without alpha) per link layer.
fn link_rgb(tag: LevelTag) -> &'static str {
	match tag {
		LevelTag::ToMinistry => "100, 180, 255",
		LevelTag::ToDepartment => "120, 220, 160",
		LevelTag::ToPerson => "255, 170, 110",
	}
}

fn dashes(ctx: &CanvasRenderingContext2d, on: f64, off: f64) {
	let _ = ctx.set_line_dash(&js_sys::Array::of2(
		&JsValue::from_f64(on),
		&JsValue::from_f64(off),
	));
}

fn solid(ctx: &CanvasRenderingContext2d) {
	let _ = ctx.set_line_dash(&js_sys::Array::new());
}

fn circle(ctx: &CanvasRenderingContext2d, x: f64, y: f64, r: f64) {
	ctx.begin_path();
	let _ = ctx.arc(x, y, r, 0.0, 2.0 * PI);
}

pub fn render(state: &ForceGraphState, ctx: &CanvasRenderingContext2d) {
	ctx.set_fill_style_str(BACKGROUND);
	ctx.fill_rect(0.0, 0.0, state.width, state.height);
	ctx.save();
	let _ = ctx.translate(state.transform.x, state.transform.y);
	let _ = ctx.scale(state.transform.k, state.transform.k);

	let mut placed: HashMap<DefaultNodeIdx, (f64, f64, f64)> = HashMap::new();
	state.graph.visit_nodes(|node| {
		placed.insert(
			node.index(),
			(node.x() as f64, node.y() as f64, node.data.user_data.radius),
		);
	});
	draw_links(state, ctx, &placed);

	// dimmed nodes first so the highlighted ones paint on top
	let highlight = state.has_active_highlight();
	state.graph.visit_nodes(|node| {
		if !(highlight && state.is_highlighted(node.index())) {
			draw_node(state, ctx, node.index(), &node.data.user_data, node.x(), node.y());
		}
	});
	if highlight {
		state.graph.visit_nodes(|node| {
			if state.is_highlighted(node.index()) {
				draw_node(state, ctx, node.index(), &node.data.user_data, node.x(), node.y());
			}
		});
	}
	ctx.restore();
}

/// Links run parent → child; person links flow, the others are solid.
fn draw_links(
	state: &ForceGraphState,
	ctx: &CanvasRenderingContext2d,
	placed: &HashMap<DefaultNodeIdx, (f64, f64, f64)>,
) {
	let k = state.transform.k;
	let t = ease_out_cubic(state.hover.highlight_t);
	let (dash, gap) = (6.0 / k, 4.0 / k);

	for &(src, tgt, tag) in state.links() {
		let (Some(&(x1, y1, r1)), Some(&(x2, y2, r2))) = (placed.get(&src), placed.get(&tgt)) else {
			continue;
		};
		let (dx, dy) = (x2 - x1, y2 - y1);
		let dist = (dx * dx + dy * dy).sqrt();
		if dist < r1 + r2 {
			continue;
		}

		let lit = state.is_highlighted(src) && state.is_highlighted(tgt);
		let alpha = if lit { 0.6 + 0.3 * t } else { 0.6 - 0.45 * t };
		let base_width = match tag {
			LevelTag::ToMinistry => 1.8,
			_ => 1.2,
		};
		ctx.set_stroke_style_str(&format!("rgba({}, {alpha})", link_rgb(tag)));
		ctx.set_line_width(base_width / k * if lit { 1.0 + 0.3 * t } else { 1.0 });
		if tag == LevelTag::ToPerson {
			dashes(ctx, dash, gap);
			ctx.set_line_dash_offset(-(state.flow_time * 30.0) % (dash + gap));
		} else {
			solid(ctx);
		}

		let (ux, uy) = (dx / dist, dy / dist);
		ctx.begin_path();
		ctx.move_to(x1 + ux * r1, y1 + uy * r1);
		ctx.line_to(x2 - ux * r2, y2 - uy * r2);
		ctx.stroke();
	}
	solid(ctx);
}

fn draw_node(
	state: &ForceGraphState,
	ctx: &CanvasRenderingContext2d,
	idx: DefaultNodeIdx,
	info: &NodeInfo,
	x: f32,
	y: f32,
) {
	let (x, y, k) = (x as f64, y as f64, state.transform.k);
	let t = ease_out_cubic(state.hover.highlight_t);
	let lit = state.has_active_highlight() && state.is_highlighted(idx);
	let hovered = lit && state.is_hovered(idx);

	let (alpha, radius) = match (state.has_active_highlight(), lit, hovered) {
		(false, _, _) => (1.0, info.radius),
		(true, false, _) => (1.0 - 0.7 * t, info.radius * (1.0 - 0.15 * t)),
		(true, true, true) => (1.0, info.radius * (1.0 + 0.35 * t)),
		(true, true, false) => (1.0, info.radius * (1.0 + 0.2 * t)),
	};

	if lit && t > 0.01 {
		let glow = info.radius * if hovered { 1.8 + 1.2 * t } else { 1.4 + 0.6 * t };
		if let Ok(gradient) = ctx.create_radial_gradient(x, y, radius * 0.3, x, y, glow) {
			let a = if hovered { 0.35 * t } else { 0.2 * t };
			let _ = gradient.add_color_stop(0.0, &format!("rgba(255, 255, 255, {a})"));
			let _ = gradient.add_color_stop(1.0, "rgba(255, 255, 255, 0)");
			circle(ctx, x, y, glow);
			#[allow(deprecated)]
			ctx.set_fill_style(&gradient);
			ctx.fill();
		}
	}

	ctx.set_global_alpha(alpha);
	circle(ctx, x, y, radius);
	ctx.set_fill_style_str(&info.color);
	ctx.fill();

	if info.synthetic {
		dashes(ctx, 2.0 / k, 2.0 / k);
		circle(ctx, x, y, radius + 1.5 / k);
		ctx.set_stroke_style_str("rgba(255, 255, 255, 0.8)");
		ctx.set_line_width(1.0 / k);
		ctx.stroke();
		solid(ctx);
	}
	if state.is_selected(idx) {
		circle(ctx, x, y, radius + 4.0 / k);
		ctx.set_stroke_style_str(SELECTED_RING);
		ctx.set_line_width(2.0 / k);
		ctx.stroke();
	}
	ctx.set_global_alpha(1.0);

	ctx.set_fill_style_str(&format!("rgba(255, 255, 255, {})", alpha * 0.85));
	ctx.set_font(&format!("{}px sans-serif", 10.0 / k.max(0.5)));
	let _ = ctx.fill_text(&info.label, x + radius + 3.0, y + 3.0);
}
