use crate::page::{PageContext, PageError};
use crate::snapshot::{FrameworkReport, FrameworkSnapshot};
use async_trait::async_trait;

/// One entry in the ranked detection list
#[async_trait]
pub trait FrameworkProbe: Send + Sync {
    fn name(&self) -> &str;

    /// Whether the framework is present on the page
    async fn probe(&self, page: &dyn PageContext) -> Result<bool, PageError>;

    /// Best-effort details, only called after a positive probe
    async fn extract(&self, page: &dyn PageContext) -> Result<FrameworkReport, PageError>;
}

/// A probe made of two in-page scripts
#[derive(Debug, Clone)]
pub struct ScriptProbe {
    name: &'static str,
    probe_script: &'static str,
    extract_script: &'static str,
}

impl ScriptProbe {
    pub const fn new(name: &'static str, probe_script: &'static str, extract_script: &'static str) -> Self {
        Self {
            name,
            probe_script,
            extract_script,
        }
    }
}

#[async_trait]
impl FrameworkProbe for ScriptProbe {
    fn name(&self) -> &str {
        self.name
    }

    async fn probe(&self, page: &dyn PageContext) -> Result<bool, PageError> {
        let value = page.execute(self.probe_script, vec![]).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn extract(&self, page: &dyn PageContext) -> Result<FrameworkReport, PageError> {
        let value = page.execute(self.extract_script, vec![]).await?;
        let mut report: FrameworkReport = serde_json::from_value(value)?;
        if report.framework.is_empty() {
            report.framework = self.name.to_string();
        }
        Ok(report)
    }
}

const REACT: ScriptProbe = ScriptProbe::new(
    "React",
    r#"return !!(window.React || window.__REACT_DEVTOOLS_GLOBAL_HOOK__ && window.__REACT_DEVTOOLS_GLOBAL_HOOK__.renderers && window.__REACT_DEVTOOLS_GLOBAL_HOOK__.renderers.size > 0 || document.querySelector('[data-reactroot]'));"#,
    r#"
const roots = document.querySelectorAll('[data-reactroot]').length;
let count = 0;
document.querySelectorAll('*').forEach(function (el) {
    for (const key in el) { if (key.indexOf('__reactFiber') === 0) { count++; break; } }
});
const hook = window.__REACT_DEVTOOLS_GLOBAL_HOOK__;
let version = (window.React && window.React.version) || null;
const antiPatterns = {};
if (hook && hook.renderers) {
    hook.renderers.forEach(function (renderer) {
        if (!version && renderer.version) version = renderer.version;
        if (renderer.bundleType === 1) antiPatterns.developmentBuild = 1;
    });
}
if (roots > 1) antiPatterns.multipleRoots = roots;
return { framework: 'React', version: version, componentCount: count || roots, antiPatterns: antiPatterns };
"#,
);

const VUE: ScriptProbe = ScriptProbe::new(
    "Vue",
    r#"return !!(window.Vue || window.__VUE__ || document.querySelector('[data-v-app]') || document.querySelector('[data-server-rendered]'));"#,
    r#"
const apps = document.querySelectorAll('[data-v-app]').length;
let count = 0;
document.querySelectorAll('*').forEach(function (el) { if (el.__vue__ || el.__vueParentComponent) count++; });
const version = (window.Vue && window.Vue.version) || null;
const antiPatterns = {};
if (apps > 1) antiPatterns.multipleAppRoots = apps;
if (window.Vue && window.Vue.config && window.Vue.config.devtools) antiPatterns.devtoolsEnabled = 1;
return { framework: 'Vue', version: version, componentCount: count || apps, antiPatterns: antiPatterns };
"#,
);

const ANGULAR: ScriptProbe = ScriptProbe::new(
    "Angular",
    r#"return !!(window.ng || window.angular || document.querySelector('[ng-version]'));"#,
    r#"
const root = document.querySelector('[ng-version]');
const version = root ? root.getAttribute('ng-version') : (window.angular && window.angular.version ? window.angular.version.full : null);
const count = document.querySelectorAll('[_nghost-ng-c], [ng-version], .ng-scope').length;
const antiPatterns = {};
if (window.ng && typeof window.ng.probe === 'function') antiPatterns.debugModeEnabled = 1;
return { framework: 'Angular', version: version, componentCount: count, antiPatterns: antiPatterns };
"#,
);

const SVELTE: ScriptProbe = ScriptProbe::new(
    "Svelte",
    r#"return !!(window.__svelte || document.querySelector('[class*="svelte-"]'));"#,
    r#"
const count = document.querySelectorAll('[class*="svelte-"]').length;
return { framework: 'Svelte', version: null, componentCount: count, antiPatterns: {} };
"#,
);

const JQUERY: ScriptProbe = ScriptProbe::new(
    "jQuery",
    r#"return !!(window.jQuery && window.jQuery.fn && window.jQuery.fn.jquery);"#,
    r#"
const version = window.jQuery.fn.jquery;
const antiPatterns = {};
if (window.$ && window.$.fn && window.$.fn.jquery && window.$.fn.jquery !== version) antiPatterns.multipleVersions = 2;
if (/^1\./.test(version)) antiPatterns.outdatedVersion = 1;
return { framework: 'jQuery', version: version, componentCount: 0, antiPatterns: antiPatterns };
"#,
);

/// Evaluates probes in rank order and stops at the first positive one
pub struct FrameworkDetector {
    probes: Vec<Box<dyn FrameworkProbe>>,
}

impl Default for FrameworkDetector {
    fn default() -> Self {
        Self::new(vec![
            Box::new(REACT),
            Box::new(VUE),
            Box::new(ANGULAR),
            Box::new(SVELTE),
            Box::new(JQUERY),
        ])
    }
}

impl FrameworkDetector {
    pub fn new(probes: Vec<Box<dyn FrameworkProbe>>) -> Self {
        Self { probes }
    }

    pub async fn collect(&self, page: &dyn PageContext) -> FrameworkSnapshot {
        for probe in &self.probes {
            match probe.probe(page).await {
                Ok(true) => {}
                Ok(false) => continue,
                Err(e) => {
                    ::log::debug!("Probe {} failed, treating as absent: {}", probe.name(), e);
                    continue;
                }
            }

            ::log::debug!("Detected framework {}", probe.name());
            let report = match probe.extract(page).await {
                Ok(report) => report,
                Err(e) => {
                    ::log::warn!("Framework collection partial failure for {}: {}", probe.name(), e);
                    FrameworkReport {
                        framework: probe.name().to_string(),
                        ..FrameworkReport::default()
                    }
                }
            };
            return FrameworkSnapshot::Detected(report);
        }

        FrameworkSnapshot::NotDetected
    }
}
