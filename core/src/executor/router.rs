use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::traits::WorkerPlugin;
use super::types::{Domain, Task};
use crate::error::ValidationError;

/// Worker-pool category a task is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolKind {
    Architect,
    Engineer,
    Qa,
    Integrator,
}

impl fmt::Display for PoolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PoolKind::Architect => "architect",
            PoolKind::Engineer => "engineer",
            PoolKind::Qa => "qa",
            PoolKind::Integrator => "integrator",
        };
        f.write_str(name)
    }
}

/// Maps domains to pools and enforces cross-domain dependency rules.
#[derive(Debug, Clone, Copy)]
pub struct DepartmentRouter {
    enforce_policy: bool,
}

impl Default for DepartmentRouter {
    fn default() -> Self {
        Self {
            enforce_policy: true,
        }
    }
}

impl DepartmentRouter {
    pub fn new(enforce_policy: bool) -> Self {
        Self { enforce_policy }
    }

    pub fn enforces_policy(&self) -> bool {
        self.enforce_policy
    }

    pub fn classify(&self, task: &Task) -> PoolKind {
        Self::pool_for(task.domain)
    }

    pub fn pool_for(domain: Domain) -> PoolKind {
        match domain {
            Domain::Architecture | Domain::Product => PoolKind::Architect,
            Domain::Implementation | Domain::Engineering => PoolKind::Engineer,
            Domain::Testing | Domain::Quality => PoolKind::Qa,
            Domain::Integration => PoolKind::Integrator,
        }
    }

    /// Classify a raw tag. Unknown tags are rejected.
    pub fn classify_tag(&self, tag: &str) -> Result<PoolKind, ValidationError> {
        Ok(Self::pool_for(tag.parse()?))
    }

    /// Domain that a task of `domain` must depend on, if any.
    pub fn required_upstream(domain: Domain) -> Option<Domain> {
        match domain {
            Domain::Implementation => Some(Domain::Architecture),
            Domain::Testing => Some(Domain::Implementation),
            _ => None,
        }
    }

    /// Check that `task` depends on at least one task of its required upstream domain.
    ///
    /// `domain_of` resolves dependency ids against the graph plus the staged batch.
    pub fn validate_dependency_policy<F>(
        &self,
        task: &Task,
        domain_of: F,
    ) -> Result<(), ValidationError>
    where
        F: Fn(&str) -> Option<Domain>,
    {
        if !self.enforce_policy {
            return Ok(());
        }
        let Some(required) = Self::required_upstream(task.domain) else {
            return Ok(());
        };
        if task
            .depends_on
            .iter()
            .any(|dep| domain_of(dep) == Some(required))
        {
            return Ok(());
        }
        Err(ValidationError::DomainPolicy {
            task_id: task.id.clone(),
            domain: task.domain,
            required,
        })
    }
}

/// Worker capabilities per pool, with a fallback for pools without a dedicated worker.
#[derive(Clone)]
pub struct WorkerPools {
    default: Arc<dyn WorkerPlugin>,
    pools: HashMap<PoolKind, Arc<dyn WorkerPlugin>>,
}

impl WorkerPools {
    pub fn new(default: Arc<dyn WorkerPlugin>) -> Self {
        Self {
            default,
            pools: HashMap::new(),
        }
    }

    pub fn with_pool(mut self, kind: PoolKind, worker: Arc<dyn WorkerPlugin>) -> Self {
        self.pools.insert(kind, worker);
        self
    }

    pub fn worker_for(&self, kind: PoolKind) -> Arc<dyn WorkerPlugin> {
        self.pools
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| self.default.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_covers_every_domain() {
        let router = DepartmentRouter::default();
        for domain in Domain::ALL {
            let task = Task::new("t", "d").with_domain(domain);
            let pool = router.classify(&task);
            assert_eq!(pool, DepartmentRouter::pool_for(domain));
        }
        assert_eq!(
            DepartmentRouter::pool_for(Domain::Testing),
            PoolKind::Qa
        );
    }

    #[test]
    fn classify_tag_rejects_unknown() {
        let router = DepartmentRouter::default();
        assert_eq!(router.classify_tag("integration").unwrap(), PoolKind::Integrator);
        assert_eq!(
            router.classify_tag("legal").unwrap_err(),
            ValidationError::UnknownDomain("legal".into())
        );
    }

    #[test]
    fn testing_requires_implementation_dependency() {
        let router = DepartmentRouter::default();
        let task = Task::new("qa", "test it")
            .with_domain(Domain::Testing)
            .depends_on(["arch"]);
        let lookup = |id: &str| (id == "arch").then_some(Domain::Architecture);
        let err = router.validate_dependency_policy(&task, lookup).unwrap_err();
        assert_eq!(
            err,
            ValidationError::DomainPolicy {
                task_id: "qa".into(),
                domain: Domain::Testing,
                required: Domain::Implementation,
            }
        );
    }

    #[test]
    fn disabled_policy_accepts_anything() {
        let router = DepartmentRouter::new(false);
        let task = Task::new("impl", "code").with_domain(Domain::Implementation);
        assert!(router.validate_dependency_policy(&task, |_| None).is_ok());
    }
}
