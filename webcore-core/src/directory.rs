// Arena of live endpoint contexts with secondary indices

use crate::cow_state::CowState;
use crate::endpoint::{ContextKey, EndpointContext};
use crate::ids::EndpointId;
use crate::metadata::EndpointKind;
use crate::module::{ModuleContext, ModuleKey};
use std::any::TypeId;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

#[derive(Clone, Default)]
struct DirectoryState {
    contexts: BTreeMap<ContextKey, Arc<EndpointContext>>,
    by_endpoint: HashMap<EndpointId, BTreeSet<ContextKey>>,
    by_module: HashMap<ModuleKey, BTreeSet<ContextKey>>,
    by_kind: HashMap<EndpointKind, BTreeSet<ContextKey>>,
}

impl DirectoryState {
    fn insert(&mut self, context: Arc<EndpointContext>) -> bool {
        let key = context.key();
        if self.contexts.contains_key(&key) {
            return false;
        }
        self.by_endpoint
            .entry(key.endpoint.clone())
            .or_default()
            .insert(key.clone());
        self.by_module
            .entry(key.module_key())
            .or_default()
            .insert(key.clone());
        self.by_kind
            .entry(context.kind())
            .or_default()
            .insert(key.clone());
        self.contexts.insert(key, context);
        true
    }

    fn remove(&mut self, key: &ContextKey) -> Option<Arc<EndpointContext>> {
        let context = self.contexts.remove(key)?;
        remove_from(&mut self.by_endpoint, &key.endpoint, key);
        remove_from(&mut self.by_module, &key.module_key(), key);
        remove_from(&mut self.by_kind, &context.kind(), key);
        Some(context)
    }

    fn resolve<'a>(&'a self, keys: Option<&'a BTreeSet<ContextKey>>) -> impl Iterator<Item = &'a Arc<EndpointContext>> + 'a {
        keys.into_iter()
            .flatten()
            .filter_map(|key| self.contexts.get(key))
    }
}

fn remove_from<K: std::hash::Hash + Eq>(
    index: &mut HashMap<K, BTreeSet<ContextKey>>,
    slot: &K,
    key: &ContextKey,
) {
    if let Some(keys) = index.get_mut(slot) {
        keys.remove(key);
        if keys.is_empty() {
            index.remove(slot);
        }
    }
}

/// Family owning each registered endpoint id and type
#[derive(Clone, Default)]
struct Claims {
    by_id: HashMap<EndpointId, EndpointKind>,
    by_type: HashMap<TypeId, EndpointKind>,
}

/// All endpoint contexts of all families.
///
/// Shared by the endpoint managers. Each write publishes a complete new
/// version, so lookups never see a half-applied attach or detach. The
/// directory also records which family owns an endpoint, since an endpoint
/// id or type may belong to one family only.
#[derive(Default)]
pub struct EndpointDirectory {
    state: CowState<DirectoryState>,
    claims: CowState<Claims>,
}

impl EndpointDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim an endpoint id and its type for `kind`.
    ///
    /// Fails with the owning family when another family holds either of them.
    /// Claiming again for the owning family succeeds.
    pub fn claim(&self, endpoint: &EndpointId, type_id: TypeId, kind: EndpointKind) -> Result<(), EndpointKind> {
        let mut conflict = None;
        self.claims.try_update(|claims| {
            let owner = claims
                .by_id
                .get(endpoint)
                .or_else(|| claims.by_type.get(&type_id))
                .copied();
            match owner {
                Some(owner) if owner != kind => {
                    conflict = Some(owner);
                    None
                }
                Some(_) => None,
                None => {
                    claims.by_id.insert(endpoint.clone(), kind);
                    claims.by_type.insert(type_id, kind);
                    Some(())
                }
            }
        });
        conflict.map_or(Ok(()), Err)
    }

    /// Give up a claim held by `kind`.
    pub fn release(&self, endpoint: &EndpointId, type_id: TypeId, kind: EndpointKind) {
        self.claims.try_update(|claims| {
            if claims.by_id.get(endpoint) != Some(&kind) {
                return None;
            }
            claims.by_id.remove(endpoint);
            claims.by_type.remove(&type_id);
            Some(())
        });
    }

    /// Family owning the endpoint id, if any
    pub fn owner_of(&self, endpoint: &EndpointId) -> Option<EndpointKind> {
        self.claims.snapshot().by_id.get(endpoint).copied()
    }

    pub fn contains(&self, key: &ContextKey) -> bool {
        self.state.snapshot().contexts.contains_key(key)
    }

    pub fn get(&self, key: &ContextKey) -> Option<Arc<EndpointContext>> {
        self.state.snapshot().contexts.get(key).cloned()
    }

    /// Insert contexts whose key is not present yet; returns the inserted ones.
    pub fn insert_all(&self, contexts: Vec<Arc<EndpointContext>>) -> Vec<Arc<EndpointContext>> {
        if contexts.is_empty() {
            return Vec::new();
        }
        self.state
            .try_update(|state| {
                let inserted: Vec<_> = contexts
                    .into_iter()
                    .filter(|context| state.insert(Arc::clone(context)))
                    .collect();
                (!inserted.is_empty()).then_some(inserted)
            })
            .unwrap_or_default()
    }

    /// Remove every context matching the predicate; returns the removed ones.
    pub fn remove_where<P>(&self, predicate: P) -> Vec<Arc<EndpointContext>>
    where
        P: Fn(&EndpointContext) -> bool,
    {
        self.state
            .try_update(|state| {
                let keys: Vec<ContextKey> = state
                    .contexts
                    .iter()
                    .filter(|(_, context)| predicate(context))
                    .map(|(key, _)| key.clone())
                    .collect();
                if keys.is_empty() {
                    return None;
                }
                Some(keys.iter().filter_map(|key| state.remove(key)).collect::<Vec<_>>())
            })
            .unwrap_or_default()
    }

    pub fn contexts(&self) -> Vec<Arc<EndpointContext>> {
        self.state.snapshot().contexts.values().cloned().collect()
    }

    pub fn contexts_of_endpoint(&self, endpoint: &EndpointId) -> Vec<Arc<EndpointContext>> {
        let state = self.state.snapshot();
        state.resolve(state.by_endpoint.get(endpoint)).cloned().collect()
    }

    pub fn contexts_of_module(&self, module: &ModuleKey) -> Vec<Arc<EndpointContext>> {
        let state = self.state.snapshot();
        state.resolve(state.by_module.get(module)).cloned().collect()
    }

    pub fn contexts_of_kind(&self, kind: EndpointKind) -> Vec<Arc<EndpointContext>> {
        let state = self.state.snapshot();
        state.resolve(state.by_kind.get(&kind)).cloned().collect()
    }

    /// Find the context of `parent` a child in `module` hangs below.
    ///
    /// Never crosses applications. Within the application the parent in the
    /// same module wins, otherwise the first in key order.
    pub fn find_parent(&self, parent: &EndpointId, module: &ModuleContext) -> Option<Arc<EndpointContext>> {
        let state = self.state.snapshot();
        let mut candidates = state
            .resolve(state.by_endpoint.get(parent))
            .filter(|context| context.application_id() == &module.application.id);

        let first = candidates.next()?;
        if first.module().id == module.id {
            return Some(Arc::clone(first));
        }
        candidates
            .find(|context| context.module().id == module.id)
            .or(Some(first))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.state.snapshot().contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.snapshot().contexts.is_empty()
    }
}
