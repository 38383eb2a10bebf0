use std::rc::Rc;
use std::sync::Arc;

use chrono::Utc;
use leptos::prelude::*;
use leptos::task::spawn_local;

use crate::api::{ApiClient, Directory, HttpRelationFetcher, RelationSource, active_ministries};
use crate::components::controls::Controls;
use crate::components::navigator::GraphNavigator;
use crate::config::NavigatorConfig;
use crate::error::ApiError;
use crate::graph::{LevelContext, LevelFilter};

const CONFIG_ELEMENT_ID: &str = "navigator-config";

/// Settings from an inline `<script id="navigator-config" type="application/json">`,
/// or the defaults when the page has none.
fn page_config() -> NavigatorConfig {
	web_sys::window()
		.and_then(|w| w.document())
		.and_then(|d| d.get_element_by_id(CONFIG_ELEMENT_ID))
		.and_then(|el| el.text_content())
		.map(|raw| NavigatorConfig::from_json(&raw))
		.unwrap_or_default()
}

/// Default Home Page
#[component]
pub fn Home() -> impl IntoView {
	let config = page_config();
	let client = ApiClient::new(&config.api_url);
	let source: Rc<dyn RelationSource> = Rc::new(HttpRelationFetcher::new(client.clone()));

	let directory = RwSignal::new(None::<Arc<Directory>>);
	let load_error = RwSignal::new(None::<ApiError>);
	let date = RwSignal::new(Utc::now().date_naive());
	let filter = RwSignal::new(LevelFilter::default());
	let context = RwSignal::new(None::<Arc<LevelContext>>);

	let (client_load, source_load, government_id) =
		(client.clone(), source.clone(), config.government_id.clone());
	spawn_local(async move {
		match Directory::load(&client_load, source_load.as_ref(), &government_id).await {
			Ok(loaded) => directory.set(Some(Arc::new(loaded))),
			Err(err) => {
				log::error!("directory load failed: {err}");
				load_error.set(Some(err));
			}
		}
	});

	// A new date (or the directory arriving) means a new leader and ministry set.
	Effect::new(move |_| {
		let (Some(dir), day) = (directory.get(), date.get()) else {
			return;
		};
		let Some(head) = dir.head_of_state_at(day).cloned() else {
			log::warn!("no head of state on {day}");
			return;
		};
		let source = source.clone();
		spawn_local(async move {
			let ministries = active_ministries(&head, day, &dir.dictionaries, source.as_ref()).await;
			if date.get_untracked() != day {
				log::debug!("dropping ministries for {day}, date moved on");
				return;
			}
			context.set(Some(Arc::new(LevelContext {
				point_in_time: day,
				head_of_state: head,
				active_ministries: ministries,
				dictionaries: dir.dictionaries.clone(),
			})));
		});
	});

	let presidents = Signal::derive(move || {
		directory.with(|d| d.as_ref().map(|d| d.presidents.clone()).unwrap_or_default())
	});
	let leader = Signal::derive(move || {
		let day = date.get();
		directory.with(|d| {
			d.as_ref()
				.and_then(|d| d.head_of_state_at(day))
				.map(|p| p.name.clone())
		})
	});

	view! {
		<ErrorBoundary fallback=|errors| {
			view! {
				<h1>"Uh oh! Something went wrong!"</h1>

				<p>"Errors: "</p>
				<ul>
					{move || {
						errors
							.get()
							.into_iter()
							.map(|(_, e)| view! { <li>{e.to_string()}</li> })
							.collect_view()
					}}
				</ul>
			}
		}>
			{move || load_error.get().map_or(Ok(()), Err)}

			<div class="fullscreen-graph">
				<GraphNavigator
					context=context
					filter=filter
					client=client
					focus_param=config.focus_param
				/>
				<div class="graph-overlay">
					<h1>"Cabinet"</h1>
					<p class="subtitle">
						"Click a ministry to open it, click it again to go back. Scroll to zoom."
					</p>
					<Controls date=date filter=filter presidents=presidents leader=leader />
				</div>
			</div>
		</ErrorBoundary>
	}
}
