use crate::error::ConfigError;
use gatekeep_core::LOWEST_PRECEDENCE;
use serde::{Deserialize, Serialize};

/// How method-security advice is woven in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdviceMode {
    /// Wrap secured services in proxies.
    #[default]
    Proxy,
    /// Weave checks in at compile time.
    #[serde(rename = "aspectj")]
    AspectJ,
}

/// Families of method-security annotations that can be switched on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationFamily {
    /// `pre_authorize` / `post_authorize` style expressions.
    PrePost,
    /// `secured` role lists.
    Secured,
    /// JSR-250 `roles_allowed` / `permit_all` / `deny_all`.
    Jsr250,
}

/// Global method-security options. Everything is off by default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MethodSecurityConfig {
    /// Enable pre/post authorization expressions.
    pub pre_post_enabled: bool,
    /// Enable secured role lists.
    pub secured_enabled: bool,
    /// Enable JSR-250 annotations.
    pub jsr250_enabled: bool,
    /// Proxy concrete types instead of interfaces. Only meaningful in [`AdviceMode::Proxy`].
    pub proxy_target_class: bool,
    /// How advice is applied.
    pub mode: AdviceMode,
    /// Position of the security advisor among other advice at the same join point.
    pub order: i32,
}

impl Default for MethodSecurityConfig {
    fn default() -> Self {
        Self {
            pre_post_enabled: false,
            secured_enabled: false,
            jsr250_enabled: false,
            proxy_target_class: false,
            mode: AdviceMode::Proxy,
            order: LOWEST_PRECEDENCE,
        }
    }
}

impl MethodSecurityConfig {
    /// Enable pre/post authorization expressions.
    pub fn pre_post_enabled(mut self, enabled: bool) -> Self {
        self.pre_post_enabled = enabled;
        self
    }

    /// Enable secured role lists.
    pub fn secured_enabled(mut self, enabled: bool) -> Self {
        self.secured_enabled = enabled;
        self
    }

    /// Enable JSR-250 annotations.
    pub fn jsr250_enabled(mut self, enabled: bool) -> Self {
        self.jsr250_enabled = enabled;
        self
    }

    /// Proxy concrete types instead of interfaces.
    pub fn proxy_target_class(mut self, enabled: bool) -> Self {
        self.proxy_target_class = enabled;
        self
    }

    /// Set the advice mode.
    pub fn mode(mut self, mode: AdviceMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the advisor order.
    pub fn order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    /// The annotation families that are switched on, in a fixed order.
    pub fn enabled_annotations(&self) -> Vec<AnnotationFamily> {
        [
            (self.pre_post_enabled, AnnotationFamily::PrePost),
            (self.secured_enabled, AnnotationFamily::Secured),
            (self.jsr250_enabled, AnnotationFamily::Jsr250),
        ]
        .into_iter()
        .filter_map(|(enabled, family)| enabled.then_some(family))
        .collect()
    }

    /// Whether any family is switched on.
    pub fn any_enabled(&self) -> bool {
        !self.enabled_annotations().is_empty()
    }

    /// Reject combinations that cannot take effect.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.any_enabled() {
            return Err(ConfigError::Invalid(
                "method security is enabled but no annotation family is switched on".to_string(),
            ));
        }
        if self.proxy_target_class && self.mode == AdviceMode::AspectJ {
            return Err(ConfigError::Invalid(
                "proxy_target_class only applies to the proxy advice mode".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_all_off() {
        let config = MethodSecurityConfig::default();
        assert!(config.enabled_annotations().is_empty());
        assert_eq!(config.mode, AdviceMode::Proxy);
        assert_eq!(config.order, LOWEST_PRECEDENCE);
        assert!(config.validate().is_err());
    }

    #[test]
    fn lists_enabled_families_in_order() {
        let config = MethodSecurityConfig::default()
            .jsr250_enabled(true)
            .pre_post_enabled(true);
        assert_eq!(
            config.enabled_annotations(),
            vec![AnnotationFamily::PrePost, AnnotationFamily::Jsr250]
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn proxy_target_class_needs_proxy_mode() {
        let config = MethodSecurityConfig::default()
            .secured_enabled(true)
            .proxy_target_class(true)
            .mode(AdviceMode::AspectJ);
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }
}
