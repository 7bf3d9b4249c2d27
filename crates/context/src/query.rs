//! Lazy, restartable entity queries.
//!
//! A [`Query`] is a description (source + filters); nothing is read until it is
//! iterated. Every evaluation goes back to the source, so a query observes the
//! store state at the time it is consumed, not when it was built.

use std::sync::Arc;

/// Filter applied to query results.
pub type Predicate<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// Supplier of the rows a query filters. Implemented by backing stores.
pub trait QuerySource<T>: Send + Sync {
    fn load(&self) -> Vec<T>;
}

impl<T, F> QuerySource<T> for F
where
    F: Fn() -> Vec<T> + Send + Sync,
{
    fn load(&self) -> Vec<T> {
        self()
    }
}

/// Deferred query over entities of type `T`.
pub struct Query<T> {
    source: Arc<dyn QuerySource<T>>,
    predicates: Vec<Predicate<T>>,
}

impl<T: 'static> Query<T> {
    pub fn new(source: Arc<dyn QuerySource<T>>) -> Self {
        Self {
            source,
            predicates: Vec::new(),
        }
    }

    /// Narrow the query. Filters compose with logical AND.
    pub fn filter(self, predicate: impl Fn(&T) -> bool + Send + Sync + 'static) -> Self {
        self.filter_by(Arc::new(predicate))
    }

    pub fn filter_by(mut self, predicate: Predicate<T>) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Evaluate now. Each call re-reads the source.
    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        self.source
            .load()
            .into_iter()
            .filter(move |item| self.predicates.iter().all(|p| p(item)))
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.iter().collect()
    }

    pub fn first(&self) -> Option<T> {
        self.iter().next()
    }

    pub fn count(&self) -> usize {
        self.iter().count()
    }

    pub fn any(&self) -> bool {
        self.first().is_some()
    }
}

impl<T> Clone for Query<T> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            predicates: self.predicates.clone(),
        }
    }
}

impl<T> core::fmt::Debug for Query<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Query")
            .field("element", &std::any::type_name::<T>())
            .field("filters", &self.predicates.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn evaluation_is_deferred_and_restartable() {
        let loads = Arc::new(AtomicUsize::new(0));
        let rows = Arc::new(Mutex::new(vec![1, 2, 3]));

        let source = {
            let loads = Arc::clone(&loads);
            let rows = Arc::clone(&rows);
            move || {
                loads.fetch_add(1, Ordering::SeqCst);
                rows.lock().unwrap().clone()
            }
        };

        let query = Query::<i32>::new(Arc::new(source)).filter(|v: &i32| v % 2 == 1);
        assert_eq!(loads.load(Ordering::SeqCst), 0);

        assert_eq!(query.to_vec(), vec![1, 3]);
        rows.lock().unwrap().push(5);
        assert_eq!(query.to_vec(), vec![1, 3, 5]);
        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn filters_compose() {
        let query = Query::<i32>::new(Arc::new(|| (1..=10).collect::<Vec<i32>>()))
            .filter(|v| *v > 3)
            .filter(|v| *v < 7);

        assert_eq!(query.count(), 3);
        assert_eq!(query.first(), Some(4));
        assert!(query.clone().filter(|v| *v > 100).first().is_none());
        assert!(query.any());
    }
}
