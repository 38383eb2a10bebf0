use leptos::ev;
use leptos::prelude::*;

use crate::graph::LevelFilter;
use crate::model::{HeadOfState, PointInTime};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Date picker, leader readout and the root-level person filter.
///
/// None of these are gated by loading: changing the date while a level is
/// still building simply supersedes that build.
#[component]
pub fn Controls(
	date: RwSignal<PointInTime>,
	filter: RwSignal<LevelFilter>,
	#[prop(into)] presidents: Signal<Vec<HeadOfState>>,
	#[prop(into)] leader: Signal<Option<String>>,
) -> impl IntoView {
	let on_date = move |ev: ev::Event| {
		let raw = event_target_value(&ev);
		match PointInTime::parse_from_str(&raw, DATE_FORMAT) {
			Ok(day) => date.set(day),
			Err(err) => log::debug!("ignoring date {raw:?}: {err}"),
		}
	};
	let on_filter = move |ev: ev::Event| filter.set(LevelFilter::parse(&event_target_value(&ev)));

	let terms = move || {
		presidents
			.get()
			.into_iter()
			.filter_map(|president| {
				let start = president.term_start?;
				Some(view! {
					<button class="term" on:click=move |_| date.set(start)>
						{president.name}
					</button>
				})
			})
			.collect_view()
	};

	view! {
		<div class="controls">
			<label>
				"Date "
				<input
					type="date"
					prop:value=move || date.get().format(DATE_FORMAT).to_string()
					on:change=on_date
				/>
			</label>
			<span class="leader">
				{move || leader.get().unwrap_or_else(|| "No head of state on this date".into())}
			</span>
			<select on:change=on_filter prop:value=move || filter.get().as_str()>
				{LevelFilter::ALL
					.into_iter()
					.map(|f| view! { <option value=f.as_str()>{f.label()}</option> })
					.collect_view()}
			</select>
			<div class="terms">{terms}</div>
		</div>
	}
}
