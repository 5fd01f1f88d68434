use std::sync::Arc;
use tracing::debug;
use tui_input::Input;

use crate::config::Config;
use crate::filters::FilterField;
use crate::navigation::{Navigator, RouteParams};
use crate::network::NetworkService;
use crate::runtime::RuntimeService;
use crate::source::{ChainSource, ItemKey, Keyed, NetworkProperties};
use crate::views::{
    EventDetailView, EventListView, ExtrinsicDetailView, ExtrinsicListView, ListKind, ListView,
};

/// Addressable pages. Detail routes carry their `"<block>-<index>"` id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Extrinsics,
    Events,
    Extrinsic(String),
    Event(String),
}

/// The live view of the current route
pub enum Screen<S: ChainSource> {
    ExtrinsicList(ExtrinsicListView<S>),
    EventList(EventListView<S>),
    ExtrinsicDetail(ExtrinsicDetailView<S>),
    EventDetail(EventDetailView<S>),
}

/// Where key presses go
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    List,
    Filter(FilterField),
}

pub struct App<S: ChainSource> {
    pub config: Config,
    pub route: Route,
    pub screen: Screen<S>,
    pub history: Vec<Route>,
    pub selected_index: usize,
    pub focus: Focus,
    pub filter_input: Input,
    pub should_quit: bool,
    source: Arc<S>,
    networks: NetworkService,
    runtime: RuntimeService<S>,
    extrinsic_query: Navigator,
    event_query: Navigator,
}

impl<S: ChainSource> App<S> {
    /// Build the app on the configured initial network and open the
    /// extrinsic list. Must be called inside a tokio runtime.
    pub fn new(config: Config, source: Arc<S>) -> Self {
        let networks = NetworkService::new();
        if let Some(network) = config.initial_network() {
            networks.set_network(&network.name, Some(network.properties()));
        }
        let runtime = RuntimeService::new(source.clone());
        let extrinsic_query = Navigator::new();
        let event_query = Navigator::new();

        let screen = open_screen(
            &Route::Extrinsics,
            &source,
            &runtime,
            &networks,
            &extrinsic_query,
            &event_query,
            config.list_size,
        );

        Self {
            config,
            route: Route::Extrinsics,
            screen,
            history: Vec::new(),
            selected_index: 0,
            focus: Focus::List,
            filter_input: Input::default(),
            should_quit: false,
            source,
            networks,
            runtime,
            extrinsic_query,
            event_query,
        }
    }

    pub fn network(&self) -> String {
        self.networks.network()
    }

    pub fn properties(&self) -> Option<NetworkProperties> {
        self.networks.properties()
    }

    pub fn networks(&self) -> &NetworkService {
        &self.networks
    }

    pub fn has_network(&self) -> bool {
        !self.networks.network().is_empty()
    }

    pub fn is_editing(&self) -> bool {
        matches!(self.focus, Focus::Filter(_))
    }

    // ==================== Navigation ====================

    pub fn navigate_to(&mut self, route: Route) {
        let previous = std::mem::replace(&mut self.route, route);
        self.history.push(previous);
        self.open_current();
    }

    pub fn go_back(&mut self) -> bool {
        match self.history.pop() {
            Some(route) => {
                self.route = route;
                self.open_current();
                true
            }
            None => false,
        }
    }

    /// Switch between the extrinsic and event lists
    pub fn toggle_list(&mut self) {
        let route = match self.route {
            Route::Extrinsics => Route::Events,
            _ => Route::Extrinsics,
        };
        self.history.clear();
        self.route = route;
        self.open_current();
    }

    /// Replace the current view. The previous one is dropped, which tears it down.
    fn open_current(&mut self) {
        debug!(route = ?self.route, "opening page");
        self.screen = open_screen(
            &self.route,
            &self.source,
            &self.runtime,
            &self.networks,
            &self.extrinsic_query,
            &self.event_query,
            self.config.list_size,
        );
        self.selected_index = 0;
        self.focus = Focus::List;
        self.filter_input.reset();
    }

    /// Select the next configured network. Returns its name.
    pub fn cycle_network(&mut self) -> Option<String> {
        let current = self.networks.network();
        let networks = &self.config.networks;
        if networks.is_empty() {
            return None;
        }
        let next = match networks.iter().position(|n| n.name == current) {
            Some(i) => &networks[(i + 1) % networks.len()],
            None => &networks[0],
        };
        if next.name == current {
            return None;
        }
        self.networks.set_network(&next.name, Some(next.properties()));
        self.selected_index = 0;
        Some(next.name.clone())
    }

    // ==================== Selection ====================

    pub fn item_count(&self) -> usize {
        match &self.screen {
            Screen::ExtrinsicList(view) => view.items().len(),
            Screen::EventList(view) => view.items().len(),
            Screen::ExtrinsicDetail(view) => view.events().value().map_or(0, Vec::len),
            Screen::EventDetail(_) => 0,
        }
    }

    pub fn select_prev(&mut self) {
        self.selected_index = self.selected_index.saturating_sub(1);
    }

    pub fn select_next(&mut self) {
        let count = self.item_count();
        if count > 0 && self.selected_index < count - 1 {
            self.selected_index += 1;
        }
    }

    /// Route to the detail page of the selected row
    pub fn selected_route(&self) -> Option<Route> {
        match &self.screen {
            Screen::ExtrinsicList(view) => view
                .items()
                .get(self.selected_index)
                .map(|item| Route::Extrinsic(item.item_key().to_string())),
            Screen::EventList(view) => view
                .items()
                .get(self.selected_index)
                .map(|item| Route::Event(item.item_key().to_string())),
            Screen::ExtrinsicDetail(view) => view
                .events()
                .value()
                .and_then(|events| events.get(self.selected_index))
                .map(|event| Route::Event(event.item_key().to_string())),
            Screen::EventDetail(view) => view.event().value().and_then(|event| {
                event
                    .extrinsic_idx
                    .map(|idx| Route::Extrinsic(ItemKey::new(event.block_number, idx).to_string()))
            }),
        }
    }

    pub fn open_selected(&mut self) -> bool {
        match self.selected_route() {
            Some(route) => {
                self.navigate_to(route);
                true
            }
            None => false,
        }
    }

    /// Load the next page once the selection reaches the end of the list
    pub fn fetch_more(&mut self) -> bool {
        match &mut self.screen {
            Screen::ExtrinsicList(view) => view.fetch_more(),
            Screen::EventList(view) => view.fetch_more(),
            _ => false,
        }
    }

    // ==================== Filters ====================

    /// Fields of the current list's filter form
    pub fn filter_fields(&self) -> Vec<FilterField> {
        match &self.screen {
            Screen::ExtrinsicList(view) => view.form().fields().collect(),
            Screen::EventList(view) => view.form().fields().collect(),
            _ => Vec::new(),
        }
    }

    pub fn filter_value(&self, field: FilterField) -> String {
        match &self.screen {
            Screen::ExtrinsicList(view) => view.filter_value(field).to_string(),
            Screen::EventList(view) => view.filter_value(field).to_string(),
            _ => String::new(),
        }
    }

    /// Start editing `field`, if the current list has it
    pub fn edit_filter(&mut self, field: FilterField) -> bool {
        if !self.filter_fields().contains(&field) {
            return false;
        }
        self.filter_input = Input::new(self.filter_value(field));
        self.focus = Focus::Filter(field);
        true
    }

    pub fn submit_filter(&mut self) -> bool {
        let Focus::Filter(field) = self.focus else {
            return false;
        };
        let value = self.filter_input.value().to_string();
        self.focus = Focus::List;
        self.filter_input.reset();
        self.set_filter(field, &value)
    }

    pub fn cancel_filter(&mut self) {
        self.focus = Focus::List;
        self.filter_input.reset();
    }

    pub fn set_filter(&mut self, field: FilterField, value: &str) -> bool {
        let changed = match &mut self.screen {
            Screen::ExtrinsicList(view) => view.set_filter(field, value),
            Screen::EventList(view) => view.set_filter(field, value),
            _ => false,
        };
        if changed {
            self.selected_index = 0;
        }
        changed
    }

    pub fn clear_filters(&mut self) -> bool {
        let changed = match &mut self.screen {
            Screen::ExtrinsicList(view) => view.clear_filters(),
            Screen::EventList(view) => view.clear_filters(),
            _ => false,
        };
        if changed {
            self.selected_index = 0;
        }
        changed
    }

    /// Step the pallet filter through the runtime's pallets
    pub fn cycle_pallet(&mut self, forward: bool) -> bool {
        let next = match &self.screen {
            Screen::ExtrinsicList(view) => next_pallet(view, forward),
            Screen::EventList(view) => next_pallet(view, forward),
            _ => None,
        };
        match next {
            Some(pallet) => self.set_filter(FilterField::Pallet, &pallet),
            None => false,
        }
    }

    /// Step the call or event name filter through the selected pallet's members
    pub fn cycle_member(&mut self, forward: bool) -> bool {
        let next = match &self.screen {
            Screen::ExtrinsicList(view) => next_member(view, forward),
            Screen::EventList(view) => next_member(view, forward),
            _ => None,
        };
        match next {
            Some((field, member)) => self.set_filter(field, &member),
            None => false,
        }
    }

    // ==================== Updates ====================

    /// Apply pending async results to the current view.
    /// Returns whether anything visible changed.
    pub fn poll(&mut self) -> bool {
        let changed = match &mut self.screen {
            Screen::ExtrinsicList(view) => view.poll(),
            Screen::EventList(view) => view.poll(),
            Screen::ExtrinsicDetail(view) => view.poll(),
            Screen::EventDetail(view) => view.poll(),
        };
        let count = self.item_count();
        if count == 0 {
            self.selected_index = 0;
        } else if self.selected_index >= count {
            self.selected_index = count - 1;
        }
        changed
    }
}

fn open_screen<S: ChainSource>(
    route: &Route,
    source: &Arc<S>,
    runtime: &RuntimeService<S>,
    networks: &NetworkService,
    extrinsic_query: &Navigator,
    event_query: &Navigator,
    list_size: u32,
) -> Screen<S> {
    match route {
        Route::Extrinsics => {
            let mut view = ExtrinsicListView::new(
                source.clone(),
                runtime.clone(),
                networks.clone(),
                extrinsic_query.clone(),
                list_size,
            );
            view.init();
            Screen::ExtrinsicList(view)
        }
        Route::Events => {
            let mut view = EventListView::new(
                source.clone(),
                runtime.clone(),
                networks.clone(),
                event_query.clone(),
                list_size,
            );
            view.init();
            Screen::EventList(view)
        }
        Route::Extrinsic(id) => {
            let params = RouteParams::new().with("id", id);
            let mut view = ExtrinsicDetailView::new(source.clone(), networks.clone(), params);
            view.init();
            Screen::ExtrinsicDetail(view)
        }
        Route::Event(id) => {
            let params = RouteParams::new().with("id", id);
            let mut view = EventDetailView::new(source.clone(), networks.clone(), params);
            view.init();
            Screen::EventDetail(view)
        }
    }
}

fn step<'a>(options: &'a [String], current: &str, forward: bool) -> Option<&'a String> {
    if options.is_empty() {
        return None;
    }
    let next = match options.iter().position(|o| o == current) {
        Some(i) if forward => (i + 1) % options.len(),
        Some(i) => (i + options.len() - 1) % options.len(),
        None if forward => 0,
        None => options.len() - 1,
    };
    options.get(next)
}

fn next_pallet<S: ChainSource, K: ListKind<S>>(
    view: &ListView<S, K>,
    forward: bool,
) -> Option<String> {
    let pallets: Vec<String> = view.pallets().map(str::to_string).collect();
    step(&pallets, view.filter_value(FilterField::Pallet), forward).cloned()
}

fn next_member<S: ChainSource, K: ListKind<S>>(
    view: &ListView<S, K>,
    forward: bool,
) -> Option<(FilterField, String)> {
    let field = view.member_field();
    step(view.members(), view.filter_value(field), forward).map(|m| (field, m.clone()))
}
