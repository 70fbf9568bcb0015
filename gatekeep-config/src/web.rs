use crate::error::ConfigError;
use crate::filter::{
    AuthenticationFilter, CsrfConfig, CsrfFilter, SecurityFilter, SecurityFilterChain,
    SessionManagementFilter,
};
use crate::matcher::RequestMatcher;
use crate::WebSecurityConfig;
use gatekeep_core::{AuthError, Authenticator, Identity, LOWEST_PRECEDENCE};
use gatekeep_session::{
    SessionAuthenticationStrategy, SessionConfig, SessionCookieStrategy, SessionStore,
};
use http::request::Parts;
use std::sync::Arc;

/// Builder for a single [`SecurityFilterChain`].
///
/// Filters always run in the same order: session restore, CSRF, authentication,
/// then any filters added with [`HttpSecurity::add_filter`].
pub struct HttpSecurity {
    matcher: RequestMatcher,
    csrf: Option<CsrfConfig>,
    authenticator: Option<Authenticator<Identity>>,
    required: bool,
    session_strategy: Option<Arc<dyn SessionAuthenticationStrategy>>,
    session_loader: Option<SessionCookieStrategy>,
    filters: Vec<Arc<dyn SecurityFilter>>,
}

impl Default for HttpSecurity {
    fn default() -> Self {
        Self {
            matcher: RequestMatcher::Any,
            csrf: Some(CsrfConfig::default()),
            authenticator: None,
            required: false,
            session_strategy: None,
            session_loader: None,
            filters: Vec::new(),
        }
    }
}

impl HttpSecurity {
    /// A builder matching every request with CSRF protection on.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict the chain to the requests selected by `matcher`.
    pub fn security_matcher(&mut self, matcher: RequestMatcher) -> &mut Self {
        self.matcher = matcher;
        self
    }

    /// Replace the CSRF settings.
    pub fn csrf(&mut self, config: CsrfConfig) -> &mut Self {
        self.csrf = Some(config);
        self
    }

    /// Turn CSRF protection off.
    pub fn disable_csrf(&mut self) -> &mut Self {
        self.csrf = None;
        self
    }

    /// Authenticate requests with `authenticator`.
    pub fn authenticate_with(&mut self, authenticator: Authenticator<Identity>) -> &mut Self {
        self.authenticator = Some(authenticator);
        self
    }

    /// Reject requests no strategy could authenticate.
    pub fn require_authentication(&mut self, required: bool) -> &mut Self {
        self.required = required;
        self
    }

    /// Run `strategy` whenever a new authentication succeeds.
    pub fn session_strategy<S>(&mut self, strategy: S) -> &mut Self
    where
        S: SessionAuthenticationStrategy + 'static,
    {
        self.session_strategy = Some(Arc::new(strategy));
        self
    }

    /// Restore identities from the session cookie described by `config`.
    pub fn session_management(
        &mut self,
        store: Arc<dyn SessionStore>,
        config: &SessionConfig,
    ) -> &mut Self {
        self.session_loader = Some(SessionCookieStrategy::new(store, config));
        self
    }

    /// Append a filter after the built-in ones.
    pub fn add_filter<F>(&mut self, filter: F) -> &mut Self
    where
        F: SecurityFilter + 'static,
    {
        self.filters.push(Arc::new(filter));
        self
    }

    /// Assemble the chain.
    pub fn build(self) -> SecurityFilterChain {
        let mut chain = SecurityFilterChain::new(self.matcher);

        if let Some(loader) = self.session_loader {
            chain.push(Arc::new(SessionManagementFilter::new(loader)));
        }
        if let Some(config) = self.csrf {
            chain.push(Arc::new(CsrfFilter::new(config)));
        }
        if self.authenticator.is_some() || self.required {
            let authenticator = self
                .authenticator
                .unwrap_or_else(|| Authenticator::builder().build());
            let mut filter = AuthenticationFilter::new(authenticator).required(self.required);
            if let Some(strategy) = self.session_strategy {
                filter = filter.session_strategy(strategy);
            }
            chain.push(Arc::new(filter));
        }
        for filter in self.filters {
            chain.push(filter);
        }
        chain
    }
}

/// Contributes one filter chain to the [`WebSecurityConfiguration`].
pub trait WebSecurityConfigurer: Send + Sync {
    /// Name used in error messages.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Position among configurers; lower is applied first. Must be unique.
    fn order(&self) -> i32 {
        LOWEST_PRECEDENCE
    }

    /// Fill in the chain.
    fn configure(&self, http: &mut HttpSecurity);
}

/// Adjusts the [`WebSecurity`] after every filter chain has been registered.
pub trait WebSecurityCustomizer: Send + Sync {
    /// Position among customizers; lower runs first.
    fn order(&self) -> i32 {
        LOWEST_PRECEDENCE
    }

    /// Apply the customization.
    fn customize(&self, web: &mut WebSecurity);
}

impl<F> WebSecurityCustomizer for F
where
    F: Fn(&mut WebSecurity) + Send + Sync,
{
    fn customize(&self, web: &mut WebSecurity) {
        self(web)
    }
}

/// Global web settings shared by every chain.
#[derive(Debug, Default)]
pub struct WebSecurity {
    ignored: Vec<RequestMatcher>,
    chains: Vec<SecurityFilterChain>,
    debug: bool,
}

impl WebSecurity {
    /// Bypass all filter chains for requests selected by `matcher`.
    pub fn ignoring(&mut self, matcher: RequestMatcher) -> &mut Self {
        self.ignored.push(matcher);
        self
    }

    /// Log every chain decision at `info`.
    pub fn debug(&mut self, debug: bool) -> &mut Self {
        self.debug = debug;
        self
    }

    /// Register another chain after the existing ones.
    pub fn add_filter_chain(&mut self, chain: SecurityFilterChain) -> &mut Self {
        self.chains.push(chain);
        self
    }

    fn build(self) -> FilterChainProxy {
        if self.debug {
            log::warn!("security debugging is enabled; request details will be logged");
        }
        FilterChainProxy {
            ignored: self.ignored,
            chains: self.chains,
            debug: self.debug,
        }
    }
}

/// Applied when neither configurers nor filter chains are registered.
struct DefaultConfigurer;

impl WebSecurityConfigurer for DefaultConfigurer {
    fn name(&self) -> &str {
        "default"
    }

    fn configure(&self, http: &mut HttpSecurity) {
        http.require_authentication(true);
    }
}

/// Collects configurers, prebuilt chains and customizers and builds the
/// [`FilterChainProxy`].
#[derive(Default)]
pub struct WebSecurityConfiguration {
    configurers: Vec<Box<dyn WebSecurityConfigurer>>,
    chains: Vec<SecurityFilterChain>,
    customizers: Vec<Box<dyn WebSecurityCustomizer>>,
    config: WebSecurityConfig,
}

impl WebSecurityConfiguration {
    /// An empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a configurer.
    pub fn configurer<C>(mut self, configurer: C) -> Self
    where
        C: WebSecurityConfigurer + 'static,
    {
        self.configurers.push(Box::new(configurer));
        self
    }

    /// Register a prebuilt chain.
    pub fn filter_chain(mut self, chain: SecurityFilterChain) -> Self {
        self.chains.push(chain);
        self
    }

    /// Register a customizer.
    pub fn customizer<C>(mut self, customizer: C) -> Self
    where
        C: WebSecurityCustomizer + 'static,
    {
        self.customizers.push(Box::new(customizer));
        self
    }

    /// Apply pipeline options.
    pub fn config(mut self, config: WebSecurityConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the proxy.
    ///
    /// Fails when configurers and prebuilt chains are mixed, or when two configurers
    /// share an order.
    pub fn build(self) -> Result<FilterChainProxy, ConfigError> {
        let Self {
            mut configurers,
            mut chains,
            mut customizers,
            config,
        } = self;

        if !configurers.is_empty() && !chains.is_empty() {
            return Err(ConfigError::ConflictingSources);
        }

        configurers.sort_by_key(|c| c.order());
        if let Some(pair) = configurers.windows(2).find(|w| w[0].order() == w[1].order()) {
            return Err(ConfigError::DuplicateOrder {
                order: pair[0].order(),
                previous: pair[0].name().to_string(),
                current: pair[1].name().to_string(),
            });
        }

        if configurers.is_empty() && chains.is_empty() {
            log::debug!("no security configuration registered, applying the default");
            configurers.push(Box::new(DefaultConfigurer));
        }

        let mut web = WebSecurity::default();
        web.debug(config.debug);

        for configurer in &configurers {
            let mut http = HttpSecurity::new();
            configurer.configure(&mut http);
            web.add_filter_chain(http.build().order(configurer.order()));
        }

        chains.sort_by_key(SecurityFilterChain::order_value);
        for chain in chains {
            web.add_filter_chain(chain);
        }

        customizers.sort_by_key(|c| c.order());
        for customizer in &customizers {
            customizer.customize(&mut web);
        }

        Ok(web.build())
    }
}

/// Dispatches requests to the first matching [`SecurityFilterChain`].
#[derive(Debug)]
pub struct FilterChainProxy {
    ignored: Vec<RequestMatcher>,
    chains: Vec<SecurityFilterChain>,
    debug: bool,
}

impl FilterChainProxy {
    /// The registered chains in dispatch order.
    pub fn chains(&self) -> &[SecurityFilterChain] {
        &self.chains
    }

    /// Whether requests to `parts` bypass every chain.
    pub fn is_ignored(&self, parts: &Parts) -> bool {
        self.ignored.iter().any(|m| m.matches(parts))
    }

    /// Run the request through the first matching chain.
    ///
    /// On success the request extensions carry whatever the filters attached, such
    /// as the authenticated [`Identity`]. The error maps to the response status with
    /// [`AuthError::status_code`].
    pub async fn filter(&self, parts: &mut Parts) -> Result<(), AuthError> {
        if self.is_ignored(parts) {
            self.trace(format_args!(
                "{} {} is ignored by security",
                parts.method,
                parts.uri.path()
            ));
            return Ok(());
        }

        let Some((index, chain)) = self
            .chains
            .iter()
            .enumerate()
            .find(|(_, chain)| chain.matches(parts))
        else {
            self.trace(format_args!(
                "no security chain matches {} {}",
                parts.method,
                parts.uri.path()
            ));
            return Ok(());
        };

        self.trace(format_args!(
            "{} {} handled by chain {} {:?}",
            parts.method,
            parts.uri.path(),
            index,
            chain.filter_names()
        ));

        for filter in chain.filters() {
            if let Err(err) = filter.do_filter(parts).await {
                self.trace(format_args!("{} rejected request: {}", filter.name(), err));
                return Err(err);
            }
        }
        Ok(())
    }

    fn trace(&self, message: std::fmt::Arguments<'_>) {
        if self.debug {
            log::info!("{message}");
        } else {
            log::debug!("{message}");
        }
    }
}
