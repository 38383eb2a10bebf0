use leptos::callback::{Callable, UnsyncCallback};
use leptos::prelude::*;

use crate::graph::NodeKind;
use crate::navigator::{PanelItem, PanelTab, PanelView};

fn kind_class(kind: NodeKind) -> &'static str {
	match kind {
		NodeKind::Government => "item item-government",
		NodeKind::Ministry => "item item-ministry",
		NodeKind::Department => "item item-department",
		NodeKind::Person => "item item-person",
	}
}

/// Lists the current level: ministries at the root, departments or people
/// inside a ministry.
#[component]
pub fn SidePanel(
	#[prop(into)] panel: Signal<PanelView>,
	on_item: UnsyncCallback<PanelItem>,
	on_tab: UnsyncCallback<PanelTab>,
	on_load_more: UnsyncCallback<()>,
	on_back: UnsyncCallback<()>,
) -> impl IntoView {
	let is_root = move || panel.with(|v| v.focus.is_root());

	let tabs = move || {
		let current = panel.with(|v| v.tab)?;
		Some(
			[PanelTab::Departments, PanelTab::Persons]
				.into_iter()
				.map(|tab| {
					let class = if tab == current { "tab active" } else { "tab" };
					view! {
						<button class=class on:click=move |_| on_tab.run(tab)>
							{tab.label()}
						</button>
					}
				})
				.collect_view(),
		)
	};

	let items = move || {
		panel.with(|v| v.items.clone())
			.into_iter()
			.map(|item| {
				let mut class = kind_class(item.kind).to_string();
				if item.selected {
					class.push_str(" selected");
				}
				if item.is_synthetic {
					class.push_str(" synthetic");
				}
				let (name, detail) = (item.name.clone(), item.detail.clone());
				view! {
					<li class=class on:click=move |_| on_item.run(item.clone())>
						<span class="item-name">{name}</span>
						{detail.map(|d| view! { <span class="item-detail">{d}</span> })}
					</li>
				}
			})
			.collect_view()
	};

	view! {
		<aside class="side-panel">
			<header>
				<Show when=move || !is_root()>
					<button class="back" on:click=move |_| on_back.run(())>
						"← Back"
					</button>
				</Show>
				<h2>{move || panel.with(|v| v.title.clone())}</h2>
				<p class="count">
					{move || panel.with(|v| format!("{} of {}", v.items.len(), v.total))}
				</p>
			</header>
			<nav class="tabs">{tabs}</nav>
			<Show
				when=move || !panel.with(|v| v.loading)
				fallback=|| view! { <p class="loading">"Loading…"</p> }
			>
				<ul class="items">{items}</ul>
				<Show when=move || panel.with(|v| v.has_more)>
					<button class="load-more" on:click=move |_| on_load_more.run(())>
						"Load more"
					</button>
				</Show>
			</Show>
		</aside>
	}
}
