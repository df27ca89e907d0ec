//! The routing state machine.
//!
//! ```text
//!            go / address change
//!   Idle ─────────────────────────► NavigationInProgress ──(render done)──► Idle
//!                                        │
//!                                        └──(interceptor veto)──► Cancelled ──► Idle
//! ```
//!
//! Every navigation runs the same pipeline:
//!
//! 1. match the path against the routes, in registration order
//! 2. unmatched: redirect to the not-found route, or drop silently
//! 3. ask the interceptor; a veto either redirects or reverts the address bar
//! 4. update the navigation stack; if skip rules resolved a different landing
//!    page, navigate there instead
//! 5. commit: write the address, set the current route, run handlers, publish
//!    on the router channels, emit `RouteMatched`, activate the page
//!
//! The address bar is only written at commit, so a vetoed target never shows
//! up in it when the navigation was started with [`Router::go`].

use crate::activation::{Activation, ImmediateActivator, PageActivator};
use crate::address::{AddressBar, AddressStrategy};
use crate::error::{RouterError, RouterResult};
use crate::events::{EventBus, RouterEvent};
use crate::interceptor::{Interception, Interceptor, InterceptorContext, merge_context};
use crate::navigation_stack::{Navigation, NavigationStack, RoutePage};
use crate::notify::{
	APP_CONTEXT_CHANNEL, AppContext, CANCELLED_BACK_NAVIGATION_CHANNEL,
	INTERCEPTED_NAVIGATION_CHANNEL, InterceptedNavigation, page_channel,
};
use crate::params::Params;
use crate::route::{Route, RouteAction, RouteSnapshot, split_query};
use crate::settings::{RouteDefinition, RouterSettings};
use portico_channels::ChannelManager;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

/// Router lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RouterState {
	#[default]
	Idle,
	NavigationInProgress,
	Cancelled,
}

/// What a navigation request ended up doing.
#[derive(Debug, Clone, PartialEq)]
pub enum NavigationOutcome {
	/// A route was committed. After redirects this is the final route.
	Committed(RouteSnapshot),
	/// The interceptor vetoed the navigation without redirect.
	Cancelled(Navigation),
	/// Another navigation was in progress.
	Dropped,
	/// The address change was caused by the router itself.
	Ignored,
	/// Nothing matched and no not-found route is registered.
	Unmatched,
}

impl NavigationOutcome {
	/// The committed route, if any.
	pub fn committed(&self) -> Option<&RouteSnapshot> {
		match self {
			Self::Committed(route) => Some(route),
			_ => None,
		}
	}
}

/// Result of [`Router::back`].
#[derive(Debug, Clone, PartialEq)]
pub struct BackNavigation {
	/// Page the user leaves.
	pub from: Option<String>,
	/// Page the user lands on. Equal to `from` when there was nowhere to go.
	pub to: Option<String>,
	/// Outcome of the navigation, `None` when nothing happened.
	pub outcome: Option<NavigationOutcome>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteMode {
	Push,
	Replace,
	/// The address bar already shows the address.
	Keep,
}

impl WriteMode {
	/// Mode for a navigation that supersedes this one.
	fn follow_up(self) -> Self {
		match self {
			Self::Push => Self::Push,
			Self::Replace | Self::Keep => Self::Replace,
		}
	}
}

#[derive(Debug)]
struct Deferred {
	channel: &'static str,
	navigation: InterceptedNavigation,
}

/// The navigation state machine.
pub struct Router {
	routes: Vec<Route>,
	current_route: Option<RouteSnapshot>,
	stack: NavigationStack,
	interceptor: Option<Interceptor>,
	interceptor_context: InterceptorContext,
	state: RouterState,
	cancelled_navigation: Option<String>,
	hash_is_dirty: bool,
	current_address: Option<String>,
	address_bar: Rc<dyn AddressBar>,
	strategy: AddressStrategy,
	channels: Option<ChannelManager>,
	events: EventBus,
	deferred: VecDeque<Deferred>,
	activator: Box<dyn PageActivator>,
	main_node: Option<String>,
	on_route_change: Option<RouteAction>,
}

impl fmt::Debug for Router {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Router")
			.field(
				"routes",
				&self.routes.iter().map(Route::name).collect::<Vec<_>>(),
			)
			.field("current_route", &self.current_route.as_ref().map(|r| &r.name))
			.field("state", &self.state)
			.field("strategy", &self.strategy)
			.field("current_address", &self.current_address)
			.field("stack", &self.stack.len())
			.field("has_interceptor", &self.interceptor.is_some())
			.field("pending_deferred", &self.deferred.len())
			.finish()
	}
}

impl Router {
	/// Creates a hash-routing router without routes.
	pub fn new(address_bar: Rc<dyn AddressBar>) -> Self {
		Self {
			routes: Vec::new(),
			current_route: None,
			stack: NavigationStack::new(),
			interceptor: None,
			interceptor_context: InterceptorContext::new(),
			state: RouterState::Idle,
			cancelled_navigation: None,
			hash_is_dirty: false,
			current_address: None,
			address_bar,
			strategy: AddressStrategy::default(),
			channels: None,
			events: EventBus::new(),
			deferred: VecDeque::new(),
			activator: Box::new(ImmediateActivator),
			main_node: None,
			on_route_change: None,
		}
	}

	/// Builds a router from settings.
	///
	/// # Errors
	///
	/// - [`RouterError::Settings`] if the settings are inconsistent
	/// - [`RouterError::RoutesNotDefined`] if the route table is missing or empty
	/// - any pattern error of the route table
	pub fn from_settings(settings: RouterSettings, address_bar: Rc<dyn AddressBar>) -> RouterResult<Self> {
		settings.validate()?;
		let strategy = AddressStrategy::select(
			settings.use_history,
			&settings.hash_prefix,
			address_bar.as_ref(),
		);
		let mut router = Self::new(address_bar).with_strategy(strategy);
		router.main_node = settings.main_node;
		router.add_routes(settings.routes)?;
		Ok(router)
	}

	pub fn with_strategy(mut self, strategy: AddressStrategy) -> Self {
		self.strategy = strategy;
		self
	}

	/// Publishes navigation state on `channels`.
	pub fn with_channels(mut self, channels: ChannelManager) -> Self {
		self.channels = Some(channels);
		self
	}

	/// Shares `events` with the rendering collaborator.
	pub fn with_events(mut self, events: EventBus) -> Self {
		self.events = events;
		self
	}

	pub fn with_activator<A>(mut self, activator: A) -> Self
	where
		A: PageActivator + 'static,
	{
		self.activator = Box::new(activator);
		self
	}

	pub fn with_main_node(mut self, main_node: impl Into<String>) -> Self {
		self.main_node = Some(main_node.into());
		self
	}

	/// Installs the navigation guard.
	pub fn with_interceptor<F>(mut self, interceptor: F) -> Self
	where
		F: Fn(&Navigation, &InterceptorContext) -> Interception + 'static,
	{
		self.interceptor = Some(Rc::new(interceptor));
		self
	}

	/// Installs the handler run after every route's own action.
	pub fn on_route_change<F>(mut self, handler: F) -> Self
	where
		F: Fn(&RouteSnapshot) + 'static,
	{
		self.on_route_change = Some(Rc::new(handler));
		self
	}

	/// Attaches a channel manager after construction.
	pub fn set_channels(&mut self, channels: ChannelManager) {
		self.channels = Some(channels);
	}

	/// Registers a route table.
	///
	/// # Errors
	///
	/// Returns [`RouterError::RoutesNotDefined`] for `None` or an empty table,
	/// and propagates pattern errors.
	pub fn add_routes(&mut self, routes: Option<Vec<RouteDefinition>>) -> RouterResult<()> {
		let routes = routes
			.filter(|routes| !routes.is_empty())
			.ok_or(RouterError::RoutesNotDefined)?;
		for definition in routes {
			self.add_route(definition.into_route()?);
		}
		Ok(())
	}

	/// Registers a single route after the existing ones.
	pub fn add_route(&mut self, route: Route) {
		tracing::info!(route = %route.name(), patterns = ?route.patterns(), "registered route");
		self.routes.push(route);
	}

	/// Navigates to the route named `page`.
	///
	/// Dropped while another navigation is in progress.
	///
	/// # Errors
	///
	/// - [`RouterError::UnknownRoute`] if no route has that name
	/// - [`RouterError::MissingParameter`] if `params` do not fill the path
	/// - [`RouterError::MainNodeMissing`] if no main node is configured
	pub fn go(&mut self, page: &str, params: Params) -> RouterResult<NavigationOutcome> {
		if self.state == RouterState::NavigationInProgress {
			tracing::debug!(route = %page, "navigation in progress, dropped");
			return Ok(NavigationOutcome::Dropped);
		}
		let path = self.route_path(page, &params)?;
		self.navigate(&path, WriteMode::Push, false)
	}

	/// Handles an address-bar change reported by the host.
	///
	/// # Errors
	///
	/// Returns [`RouterError::MainNodeMissing`] if no main node is configured.
	pub fn handle_address_change(&mut self) -> RouterResult<NavigationOutcome> {
		let address = self.address_bar.read();

		if self.hash_is_dirty {
			self.hash_is_dirty = false;
			tracing::debug!(address = %address, "subroute update, ignored");
			return Ok(NavigationOutcome::Ignored);
		}

		let path = self.strategy.parse(&address);
		if let Some(cancelled) = self.cancelled_navigation.take() {
			let reverted = self.current_address.as_deref() == Some(address.as_str());
			if reverted || self.matching_route_name(&path) == Some(cancelled.as_str()) {
				tracing::debug!(route = %cancelled, "cancelled navigation echo, ignored");
				return Ok(NavigationOutcome::Ignored);
			}
		}

		if self.current_address.as_deref() == Some(address.as_str()) {
			return Ok(NavigationOutcome::Ignored);
		}

		self.navigate(&path, WriteMode::Keep, false)
	}

	/// Goes back one logical step, passing over skip-marked entries.
	///
	/// With one entry or fewer this does nothing and reports `from == to`.
	///
	/// # Errors
	///
	/// Returns [`RouterError::NoBackTarget`] if no entry remains to land on,
	/// and propagates navigation errors.
	pub fn back(&mut self) -> RouterResult<BackNavigation> {
		if self.stack.len() <= 1 {
			let page = self.stack.top().map(|top| top.page.clone());
			return Ok(BackNavigation {
				from: page.clone(),
				to: page,
				outcome: None,
			});
		}

		let saved = self.stack.clone();
		let from = self.stack.pop().map(|entry| entry.page);
		while self.stack.len() > 1 && self.stack.top_is_skipped() {
			self.stack.pop();
		}
		let Some(target) = self.stack.top().cloned() else {
			self.stack = saved;
			return Err(RouterError::NoBackTarget);
		};

		self.events.emit(RouterEvent::BackstepRequested {
			from: from.clone().unwrap_or_default(),
			to: target.page.clone(),
		});

		let outcome = self
			.route_path(&target.page, &target.params)
			.and_then(|path| self.navigate(&path, WriteMode::Replace, true));
		if matches!(outcome, Ok(NavigationOutcome::Cancelled(_)) | Err(_)) {
			self.stack = saved;
		}
		let outcome = outcome?;
		Ok(BackNavigation {
			from,
			to: Some(target.page),
			outcome: Some(outcome),
		})
	}

	/// Render-complete signal: finishes the in-flight transition.
	///
	/// Returns `false` if no transition was in flight.
	pub fn transition_end(&mut self) -> bool {
		if self.state != RouterState::NavigationInProgress {
			return false;
		}
		self.state = RouterState::Idle;
		let route = self
			.current_route
			.as_ref()
			.map(|route| route.name.clone())
			.unwrap_or_default();
		self.events.emit(RouterEvent::TransitionEnd { route });
		true
	}

	/// Appends `subroute` to the current route's path with a replacing write.
	///
	/// In hash mode the address change this causes is ignored. Nothing is
	/// written when the address is already current. Returns `false` when there
	/// is no current route.
	///
	/// # Errors
	///
	/// Propagates path generation errors.
	pub fn update_subroute_in_browser(&mut self, subroute: &str) -> RouterResult<bool> {
		let Some(current) = self.current_route.as_ref() else {
			tracing::warn!(subroute, "no current route, subroute update ignored");
			return Ok(false);
		};
		let full = self.route_path(&current.name, &current.params)?;
		let (path, query) = split_query(&full);
		let suffix = subroute.trim_start_matches('/');
		let mut target = format!("{}/{}", path.trim_end_matches('/'), suffix);
		if let Some(query) = query {
			target.push('?');
			target.push_str(query);
		}

		let address = self.strategy.format(&target);
		if let Some(current) = self.current_route.as_mut() {
			current.subroute = (!suffix.is_empty()).then(|| format!("/{}", suffix));
		}
		// An unchanged address produces no change event to swallow.
		if self.address_bar.read() == address {
			self.current_address = Some(address);
			return Ok(true);
		}
		self.address_bar.replace(&address);
		self.current_address = Some(address);
		if !self.strategy.is_history() {
			self.hash_is_dirty = true;
		}
		Ok(true)
	}

	/// Delivers queued intercepted-navigation notifications.
	///
	/// Hosts call this on the next tick after a veto. Returns the number of
	/// notifications delivered.
	pub fn run_deferred(&mut self) -> usize {
		let pending: Vec<Deferred> = self.deferred.drain(..).collect();
		let count = pending.len();
		for item in pending {
			match &self.channels {
				Some(channels) => {
					channels.publish_internal::<InterceptedNavigation>(item.channel, item.navigation);
				}
				None => {
					tracing::debug!(channel = item.channel, "no channel manager, notification dropped");
				}
			}
		}
		count
	}

	/// Number of notifications waiting for [`run_deferred`](Self::run_deferred).
	pub fn pending_deferred(&self) -> usize {
		self.deferred.len()
	}

	/// Merges `update` into the interceptor context.
	pub fn update_interceptor_context(&mut self, update: InterceptorContext) {
		merge_context(&mut self.interceptor_context, update);
	}

	/// Replaces the interceptor context.
	pub fn set_interceptor_context(&mut self, context: InterceptorContext) {
		self.interceptor_context = context;
	}

	/// Returns a copy of the interceptor context.
	pub fn interceptor_context(&self) -> InterceptorContext {
		self.interceptor_context.clone()
	}

	/// Matches a path (with optional `?query`) and returns the matched route.
	///
	/// Inaccessible not-found routes are skipped.
	pub fn match_route(&mut self, path: &str) -> Option<RouteSnapshot> {
		self.find_route(path).map(|index| self.routes[index].snapshot())
	}

	/// Forgets the current route and history. Routes and skip rules stay.
	pub fn reset(&mut self) {
		self.stack.clear();
		self.current_route = None;
		self.current_address = None;
		self.cancelled_navigation = None;
		self.hash_is_dirty = false;
		self.deferred.clear();
		self.state = RouterState::Idle;
	}

	pub fn current_route(&self) -> Option<&RouteSnapshot> {
		self.current_route.as_ref()
	}

	pub fn state(&self) -> RouterState {
		self.state
	}

	pub fn is_navigation_in_progress(&self) -> bool {
		self.state == RouterState::NavigationInProgress
	}

	pub fn navigation_stack(&self) -> &NavigationStack {
		&self.stack
	}

	pub fn navigation_stack_mut(&mut self) -> &mut NavigationStack {
		&mut self.stack
	}

	/// Records a skip rule on the navigation stack.
	pub fn add_skip_navigation(&mut self, from: &str, to: &str, skip_history: Option<bool>) {
		self.stack.add_skip_navigation(from, to, skip_history);
	}

	pub fn route(&self, name: &str) -> Option<&Route> {
		self.routes.iter().find(|route| route.name() == name)
	}

	pub fn routes(&self) -> &[Route] {
		&self.routes
	}

	pub fn events(&self) -> &EventBus {
		&self.events
	}

	pub fn strategy(&self) -> &AddressStrategy {
		&self.strategy
	}

	/// Last address the router wrote or accepted.
	pub fn current_address(&self) -> Option<&str> {
		self.current_address.as_deref()
	}

	/// Route name whose address-change echo will be ignored.
	pub fn cancelled_navigation(&self) -> Option<&str> {
		self.cancelled_navigation.as_deref()
	}

	pub fn hash_is_dirty(&self) -> bool {
		self.hash_is_dirty
	}

	pub fn main_node(&self) -> Option<&str> {
		self.main_node.as_deref()
	}

	fn route_path(&self, page: &str, params: &Params) -> RouterResult<String> {
		self.route(page)
			.ok_or_else(|| RouterError::UnknownRoute(page.to_string()))?
			.path(params)
	}

	fn find_route(&mut self, path: &str) -> Option<usize> {
		self.routes
			.iter_mut()
			.enumerate()
			.filter(|(_, route)| !route.is_404() || route.is_accessible())
			.find_map(|(index, route)| route.parse_path(path).then_some(index))
	}

	fn matching_route_name(&self, path: &str) -> Option<&str> {
		let (path, _) = split_query(path);
		self.routes
			.iter()
			.filter(|route| !route.is_404() || route.is_accessible())
			.find(|route| route.match_path(path).is_some())
			.map(Route::name)
	}

	fn navigate(&mut self, path: &str, mode: WriteMode, back: bool) -> RouterResult<NavigationOutcome> {
		let Some(main_node) = self.main_node.clone() else {
			return Err(RouterError::MainNodeMissing);
		};
		self.state = RouterState::NavigationInProgress;

		let Some(index) = self.find_route(path) else {
			return self.navigate_not_found(path, mode);
		};

		let to = self.routes[index].snapshot();
		let from = self.current_route.clone();
		let navigation = Navigation::new(from.as_ref().map(|route| route.name.as_str()), to.name.clone());
		tracing::debug!(from = ?navigation.from, to = %navigation.to, path, "navigation started");

		if let Some(interceptor) = self.interceptor.clone() {
			let decision = interceptor(&navigation, &self.interceptor_context);
			if decision.intercept {
				return self.cancel(navigation, decision.redirect, mode, back);
			}
		}

		let from_page = from
			.as_ref()
			.map(|route| RoutePage::new(route.name.clone()).with_params(route.params.clone()));
		let to_page = RoutePage::new(to.name.clone()).with_params(to.params.clone());
		let saved = self.stack.clone();
		let resolved = self.stack.update(from_page.as_ref(), to_page).cloned();
		if let Some(resolved) = resolved
			&& resolved.page != to.name
		{
			tracing::debug!(requested = %to.name, resolved = %resolved.page, "skip rules resolved another page");
			self.state = RouterState::Idle;
			let outcome = self
				.route_path(&resolved.page, &resolved.params)
				.and_then(|path| self.navigate(&path, mode.follow_up(), back));
			// Nothing was committed, undo the collapse.
			if matches!(outcome, Ok(NavigationOutcome::Cancelled(_)) | Err(_)) {
				self.stack = saved;
			}
			return outcome;
		}

		self.commit(index, path, mode, from, &main_node)
	}

	fn navigate_not_found(&mut self, path: &str, mode: WriteMode) -> RouterResult<NavigationOutcome> {
		let not_found = self
			.routes
			.iter()
			.position(|route| route.is_404() && !route.is_accessible() && route.redirect_page().is_some());
		let Some(index) = not_found else {
			tracing::warn!(path, "no route matches, navigation dropped");
			self.state = RouterState::Idle;
			return Ok(NavigationOutcome::Unmatched);
		};

		let target = self.routes[index].redirect_page().unwrap_or_default().to_string();
		tracing::info!(path, route = %target, "no route matches, redirecting to not-found page");
		self.state = RouterState::Idle;
		self.routes[index].set_accessible(true);
		let result = self
			.route_path(&target, &Params::new())
			.and_then(|target_path| self.navigate(&target_path, mode.follow_up(), false));
		self.routes[index].set_accessible(false);
		result
	}

	fn cancel(
		&mut self,
		navigation: Navigation,
		redirect: Option<RoutePage>,
		mode: WriteMode,
		back: bool,
	) -> RouterResult<NavigationOutcome> {
		self.state = RouterState::Cancelled;
		self.deferred.push_back(Deferred {
			channel: INTERCEPTED_NAVIGATION_CHANNEL,
			navigation: navigation.clone(),
		});
		if back {
			self.deferred.push_back(Deferred {
				channel: CANCELLED_BACK_NAVIGATION_CHANNEL,
				navigation: navigation.clone(),
			});
		}

		if let Some(redirect) = redirect {
			tracing::info!(from = ?navigation.from, to = %navigation.to, redirect = %redirect.page, "navigation redirected");
			self.state = RouterState::Idle;
			let path = self.route_path(&redirect.page, &redirect.params)?;
			return self.navigate(&path, mode.follow_up(), false);
		}

		tracing::info!(from = ?navigation.from, to = %navigation.to, "navigation cancelled");
		if let Some(current) = self.current_address.clone()
			&& self.address_bar.read() != current
		{
			self.address_bar.replace(&current);
			self.cancelled_navigation = Some(navigation.to.clone());
		}
		self.state = RouterState::Idle;
		Ok(NavigationOutcome::Cancelled(navigation))
	}

	fn commit(
		&mut self,
		index: usize,
		path: &str,
		mode: WriteMode,
		from: Option<RouteSnapshot>,
		main_node: &str,
	) -> RouterResult<NavigationOutcome> {
		let route = self.routes[index].snapshot();

		let address = match mode {
			WriteMode::Push => {
				let address = self.strategy.format(path);
				self.address_bar.push(&address);
				address
			}
			WriteMode::Replace => {
				let address = self.strategy.format(path);
				self.address_bar.replace(&address);
				address
			}
			WriteMode::Keep => self.address_bar.read(),
		};
		self.current_address = Some(address);
		self.current_route = Some(route.clone());
		tracing::info!(route = %route.name, params = ?route.params, "navigation committed");

		if let Some(action) = self.routes[index].action().cloned() {
			action(&route);
		}
		if let Some(handler) = self.on_route_change.clone() {
			handler(&route);
		}

		if let Some(channels) = &self.channels {
			let from_page = from.map(|previous| previous.name);
			if let Some(previous) = from_page.as_deref()
				&& previous != route.name
			{
				channels.publish_internal::<bool>(&page_channel(previous), false);
			}
			channels.publish_internal::<AppContext>(
				APP_CONTEXT_CHANNEL,
				AppContext {
					current_page: route.name.clone(),
					from_page,
					interceptor_context: self.interceptor_context.clone(),
					current_route: route.clone(),
				},
			);
			channels.publish_internal::<bool>(&page_channel(&route.name), true);
		}

		self.events.emit(RouterEvent::RouteMatched(route.clone()));

		match self.activator.activate(&route, main_node) {
			Activation::Complete => {
				self.transition_end();
			}
			Activation::Pending => {
				tracing::debug!(route = %route.name, "waiting for render completion");
			}
		}
		Ok(NavigationOutcome::Committed(route))
	}
}
