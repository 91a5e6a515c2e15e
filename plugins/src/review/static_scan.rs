use std::collections::{BTreeMap, HashSet};
use std::sync::OnceLock;

use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;
use swarm_core::api::{
    Artifact, Defect, ReviewKind, ReviewRequest, ReviewerPlugin, Severity, StaticScanConfig,
};

const ASSET_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "bmp", "svg", "ico", "ttf", "otf", "woff", "wav", "mp3", "ogg",
];

const SOURCE_EXTENSIONS: &[&str] = &[
    "py", "ts", "js", "tsx", "jsx", "java", "rs", "go", "c", "cpp", "h",
];

const STDLIB_MODULES: &[&str] = &[
    "os", "sys", "re", "json", "math", "random", "time", "datetime", "pathlib", "collections",
    "itertools", "functools", "typing", "abc", "io", "copy", "enum", "dataclasses", "logging",
    "unittest", "argparse", "subprocess", "threading", "multiprocessing", "asyncio", "socket",
    "http", "urllib", "hashlib", "hmac", "secrets", "string", "textwrap", "struct", "csv",
    "configparser", "tempfile", "shutil", "glob", "fnmatch", "stat", "traceback", "warnings",
    "contextlib", "decimal", "fractions", "statistics", "pprint", "inspect", "importlib",
    "platform", "signal", "queue", "heapq", "bisect", "array", "weakref", "types", "operator",
];

const KNOWN_THIRD_PARTY: &[&str] = &[
    "pygame", "flask", "django", "fastapi", "numpy", "pandas", "scipy", "matplotlib", "requests",
    "httpx", "aiohttp", "sqlalchemy", "pydantic", "click", "rich", "pytest", "dotenv", "PIL",
    "cv2", "torch", "yaml", "toml", "bs4", "lxml", "jinja2", "uvicorn", "starlette", "attrs",
];

fn asset_load_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"pygame\.image\.load\s*\(",
            r#"(?i)pygame\.font\.Font\s*\(\s*["'][^"']+\.(ttf|otf|woff)"#,
            r"pygame\.mixer\.\w+\.load\s*\(",
            r"(?i)open\s*\([^)]*\.(png|jpg|jpeg|gif|bmp|svg|ttf|wav|mp3|ogg)",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("asset pattern"))
        .collect()
    })
}

fn bare_import() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^\s*from\s+([A-Za-z_][A-Za-z0-9_.]*)\s+import\s").expect("import pattern")
    })
}

/// Offline reviewer: flags the structural problems a generated project most
/// often ships with, without running any of it.
pub struct StaticScanReviewerPlugin {
    cfg: StaticScanConfig,
}

impl StaticScanReviewerPlugin {
    pub fn new(cfg: StaticScanConfig) -> Self {
        Self { cfg }
    }

    fn scan(&self, request: &ReviewRequest) -> Vec<Defect> {
        let mut defects = Vec::new();
        for (path, artifact) in &request.artifacts {
            self.scan_file(path, artifact, &request.artifacts, &mut defects);
        }
        if request.kind == ReviewKind::Reconcile {
            self.check_manifests(&request.artifacts, &mut defects);
        }
        defects
    }

    fn scan_file(
        &self,
        path: &str,
        artifact: &Artifact,
        all: &BTreeMap<String, Artifact>,
        out: &mut Vec<Defect>,
    ) {
        let ext = extension(path);
        if ASSET_EXTENSIONS.contains(&ext.as_str()) {
            out.push(
                Defect::new(
                    Severity::Integrity,
                    format!("{path} is an external asset file; replace it with code that draws or synthesizes it"),
                )
                .with_scope([path]),
            );
            return;
        }
        if artifact.content.trim().is_empty() && !path.ends_with("__init__.py") {
            out.push(Defect::new(Severity::Incomplete, format!("{path} is empty")).with_scope([path]));
            return;
        }
        if !SOURCE_EXTENSIONS.contains(&ext.as_str()) {
            return;
        }
        let text = &artifact.content;

        let todos = text.to_uppercase().matches("TODO").count();
        if todos > 0 {
            out.push(
                Defect::new(Severity::Incomplete, format!("{path} contains {todos} TODO markers"))
                    .with_scope([path]),
            );
        }
        if text.contains("pass  # placeholder") {
            out.push(
                Defect::new(Severity::Incomplete, format!("{path} contains placeholder pass statements"))
                    .with_scope([path]),
            );
        }

        for pattern in asset_load_patterns() {
            if let Some(m) = pattern.find(text) {
                out.push(
                    Defect::new(
                        Severity::Integrity,
                        format!("{path} loads an asset file ('{}'); use shapes or system fonts instead", m.as_str()),
                    )
                    .with_scope([path]),
                );
            }
        }

        if ext == "py" {
            bare_package_imports(path, text, all, out);
        }

        let long: Vec<usize> = text
            .lines()
            .enumerate()
            .filter(|(_, line)| line.chars().count() > self.cfg.max_line_len)
            .map(|(i, _)| i + 1)
            .collect();
        if let Some(first) = long.first() {
            out.push(
                Defect::new(
                    Severity::Style,
                    format!(
                        "{path} has {} lines longer than {} characters (first at line {first})",
                        long.len(),
                        self.cfg.max_line_len
                    ),
                )
                .with_scope([path]),
            );
        }
    }

    fn check_manifests(&self, all: &BTreeMap<String, Artifact>, out: &mut Vec<Defect>) {
        let has_code = all
            .keys()
            .any(|p| SOURCE_EXTENSIONS.contains(&extension(p).as_str()));
        if !has_code {
            return;
        }
        for manifest in &self.cfg.required_manifests {
            if !all.contains_key(manifest) {
                out.push(
                    Defect::new(Severity::MissingDependency, format!("{manifest} is missing"))
                        .with_scope([manifest]),
                );
            }
        }
    }
}

/// `from sibling import x` inside a package breaks once the package is
/// imported from outside; it must be `from .sibling import x`.
fn bare_package_imports(
    path: &str,
    text: &str,
    all: &BTreeMap<String, Artifact>,
    out: &mut Vec<Defect>,
) {
    let dir = match path.rfind('/') {
        Some(i) => &path[..=i],
        None => "",
    };
    if !all.contains_key(&format!("{dir}__init__.py")) {
        return;
    }
    let stdlib: HashSet<&str> = STDLIB_MODULES.iter().copied().collect();
    let third_party: HashSet<&str> = KNOWN_THIRD_PARTY.iter().copied().collect();

    for caps in bare_import().captures_iter(text) {
        let module = &caps[1];
        let top = module.split('.').next().unwrap_or(module);
        if module.starts_with("__") || stdlib.contains(module) || third_party.contains(top) {
            continue;
        }
        let as_path = module.replace('.', "/");
        let sibling_file = format!("{dir}{as_path}.py");
        let sibling_pkg = format!("{dir}{as_path}/__init__.py");
        if all.contains_key(&sibling_file) || all.contains_key(&sibling_pkg) {
            out.push(
                Defect::new(
                    Severity::Crash,
                    format!("{path}: 'from {module} import ...' should be 'from .{module} import ...'"),
                )
                .with_scope([path]),
            );
        }
    }
}

fn extension(path: &str) -> String {
    let name = path.rsplit('/').next().unwrap_or(path);
    match name.rfind('.') {
        Some(i) if i > 0 => name[i + 1..].to_ascii_lowercase(),
        _ => String::new(),
    }
}

#[async_trait]
impl ReviewerPlugin for StaticScanReviewerPlugin {
    fn name(&self) -> &str {
        "static_scan"
    }

    async fn inspect(&self, request: &ReviewRequest) -> Result<Vec<Defect>> {
        let defects = self.scan(request);
        tracing::debug!(
            kind = ?request.kind,
            files = request.artifacts.len(),
            defects = defects.len(),
            "static scan finished"
        );
        Ok(defects)
    }
}
