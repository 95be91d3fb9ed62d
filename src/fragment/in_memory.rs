use super::{Fragment, FragmentError, FragmentResult, Operation, PartialRecord};
use crate::song_director::{Property, PropertyValue};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Debug, Clone, Copy)]
enum FailurePlan {
    Always,
    /// Lets the first `n` calls through, fails the rest.
    After(usize),
}

/// A call received by an [`InMemoryFragment`], including the failed ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentCall {
    pub operation: Operation,
    pub id: Option<String>,
}

#[derive(Default)]
struct State {
    records: BTreeMap<String, PartialRecord>,
    failures: HashMap<Operation, FailurePlan>,
    call_counts: HashMap<Operation, usize>,
    calls: Vec<FragmentCall>,
}

/// Fragment keeping its records in memory.
///
/// Used as the fallback store when nothing else is configured. Failure injection
/// and the call log make it the fragment of choice when exercising the coordinator.
pub struct InMemoryFragment {
    name: String,
    properties: Vec<Property>,
    generates_ids: bool,
    execution_order: HashMap<Operation, i32>,
    state: Mutex<State>,
}

impl InMemoryFragment {
    pub fn new<S: Into<String>>(name: S, properties: &[Property]) -> Self {
        Self {
            name: name.into(),
            properties: properties.to_vec(),
            generates_ids: false,
            execution_order: HashMap::new(),
            state: Mutex::new(State::default()),
        }
    }

    /// Assigns a uuid to records added without an id.
    pub fn generating_ids(mut self) -> Self {
        self.generates_ids = true;
        self
    }

    pub fn with_execution_order(mut self, operation: Operation, order: i32) -> Self {
        self.execution_order.insert(operation, order);
        self
    }

    /// Seeds a record, keeping only the fields this fragment owns.
    pub fn with_record(mut self, record: PartialRecord) -> Self {
        if let Some(id) = record.id.clone() {
            let projected = record.project(&self.properties);
            self.state.get_mut().records.insert(id, projected);
        }
        self
    }

    pub fn fail_on(mut self, operation: Operation) -> Self {
        self.state
            .get_mut()
            .failures
            .insert(operation, FailurePlan::Always);
        self
    }

    pub fn fail_after(mut self, operation: Operation, successful_calls: usize) -> Self {
        self.state
            .get_mut()
            .failures
            .insert(operation, FailurePlan::After(successful_calls));
        self
    }

    pub async fn calls(&self) -> Vec<FragmentCall> {
        self.state.lock().await.calls.clone()
    }

    pub async fn calls_to(&self, operation: Operation) -> Vec<FragmentCall> {
        self.state
            .lock()
            .await
            .calls
            .iter()
            .filter(|c| c.operation == operation)
            .cloned()
            .collect()
    }

    pub async fn record(&self, id: &str) -> Option<PartialRecord> {
        self.state.lock().await.records.get(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn owns(&self, property: Property) -> bool {
        self.properties.contains(&property)
    }

    /// Logs the call and applies the failure plan for `operation`.
    fn begin(
        &self,
        state: &mut State,
        operation: Operation,
        id: Option<&str>,
    ) -> FragmentResult<()> {
        state.calls.push(FragmentCall {
            operation,
            id: id.map(str::to_string),
        });
        let count = state.call_counts.entry(operation).or_insert(0);
        *count += 1;

        let fail = match state.failures.get(&operation) {
            Some(FailurePlan::Always) => true,
            Some(FailurePlan::After(n)) => *count > *n,
            None => false,
        };
        if fail {
            debug!("Fragment {} failing {} as planned", self.name, operation);
            return Err(FragmentError::Store(format!(
                "{} failed on {}",
                self.name, operation
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Fragment for InMemoryFragment {
    fn name(&self) -> &str {
        &self.name
    }

    fn operation_execution_order(&self, operation: Operation) -> i32 {
        self.execution_order.get(&operation).copied().unwrap_or(0)
    }

    async fn try_add(&self, record: &PartialRecord) -> FragmentResult<Option<String>> {
        let mut state = self.state.lock().await;
        self.begin(&mut state, Operation::Add, record.id.as_deref())?;

        let id = match &record.id {
            Some(id) => id.clone(),
            None if self.generates_ids => uuid::Uuid::new_v4().to_string(),
            None => return Err(FragmentError::MissingId(self.name.clone())),
        };
        if state.records.contains_key(&id) {
            return Err(FragmentError::AlreadyExists(id));
        }

        let mut stored = record.project(&self.properties);
        stored.id = Some(id.clone());
        state.records.insert(id.clone(), stored);
        Ok(Some(id))
    }

    async fn try_find_property_by_id(
        &self,
        id: &str,
        property: Property,
    ) -> FragmentResult<Option<PropertyValue>> {
        let mut state = self.state.lock().await;
        self.begin(&mut state, Operation::FindPropertyById, Some(id))?;

        if !self.owns(property) {
            return Err(FragmentError::PropertyNotStored {
                fragment: self.name.clone(),
                property,
            });
        }
        let record = state
            .records
            .get(id)
            .ok_or_else(|| FragmentError::NotFound(id.to_string()))?;
        record.property(property).map_err(|value| FragmentError::InvalidValue { property, value })
    }

    async fn try_get_all(&self) -> FragmentResult<Vec<PartialRecord>> {
        let mut state = self.state.lock().await;
        self.begin(&mut state, Operation::GetAll, None)?;
        Ok(state.records.values().cloned().collect())
    }

    async fn try_get_by_id(&self, id: &str) -> FragmentResult<PartialRecord> {
        let mut state = self.state.lock().await;
        self.begin(&mut state, Operation::GetById, Some(id))?;
        state
            .records
            .get(id)
            .cloned()
            .ok_or_else(|| FragmentError::NotFound(id.to_string()))
    }

    async fn try_remove_by_id(&self, id: &str) -> FragmentResult<()> {
        let mut state = self.state.lock().await;
        self.begin(&mut state, Operation::RemoveById, Some(id))?;
        state
            .records
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| FragmentError::NotFound(id.to_string()))
    }

    async fn try_update(&self, record: &PartialRecord) -> FragmentResult<()> {
        let mut state = self.state.lock().await;
        self.begin(&mut state, Operation::Update, record.id.as_deref())?;

        let id = record
            .id
            .clone()
            .ok_or_else(|| FragmentError::MissingId(self.name.clone()))?;
        let stored = state
            .records
            .get_mut(&id)
            .ok_or_else(|| FragmentError::NotFound(id.clone()))?;
        *stored = record.project(&self.properties);
        Ok(())
    }

    async fn try_rollback_remove(&self, record: &PartialRecord) -> FragmentResult<()> {
        let mut state = self.state.lock().await;
        self.begin(&mut state, Operation::RollbackRemove, record.id.as_deref())?;

        let id = record
            .id
            .clone()
            .ok_or_else(|| FragmentError::MissingId(self.name.clone()))?;
        state.records.insert(id, record.project(&self.properties));
        Ok(())
    }
}
