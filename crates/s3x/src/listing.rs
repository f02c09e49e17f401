//! 📄 Listing: walking a bucket one page at a time, bouncer included.
//!
//! The lister owns the cursor so nobody else has to. Each call to
//! [`ObjectLister::next_page`] asks the store for at most `page_size` entries,
//! runs them past the [`ObjectFilter`], and reports what survived alongside how
//! many entries were looked at. Order is whatever the store hands back.
//!
//! 💀 A listing error ends the search. No retries, no partial pages.

use anyhow::{Result, bail};
use tracing::{debug, trace};

use crate::backends::ObjectStore;
use crate::common::{BucketLocation, ObjectDescriptor};
use crate::filters::ObjectFilter;

/// 📦 One page, post-bouncer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ListedPage {
    /// 🎯 Entries that passed the size and time checks.
    pub(crate) candidates: Vec<ObjectDescriptor>,
    /// 🔢 Raw entries the store returned for this page.
    pub(crate) listed: usize,
    pub(crate) has_more: bool,
}

/// 🗂️ Lazy, cursor-driven pagination over one bucket.
#[derive(Debug)]
pub(crate) struct ObjectLister<'a, S: ObjectStore + ?Sized> {
    store: &'a S,
    location: &'a BucketLocation,
    filter: ObjectFilter,
    page_size: usize,
    cursor: Option<String>,
    exhausted: bool,
}

impl<'a, S: ObjectStore + ?Sized> ObjectLister<'a, S> {
    pub(crate) fn new(
        store: &'a S,
        location: &'a BucketLocation,
        filter: ObjectFilter,
        page_size: usize,
    ) -> Self {
        Self {
            store,
            location,
            filter,
            page_size: page_size.max(1),
            cursor: None,
            exhausted: false,
        }
    }

    /// 📄 The next page, or `None` once the store has nothing more to say.
    pub(crate) async fn next_page(&mut self) -> Result<Option<ListedPage>> {
        if self.exhausted {
            return Ok(None);
        }

        let page = self
            .store
            .list_page(self.location, self.cursor.as_deref(), self.page_size)
            .await?;

        let listed = page.objects.len();
        let candidates: Vec<ObjectDescriptor> = page
            .objects
            .into_iter()
            .filter(|object| {
                let admitted = self.filter.admits(object);
                if !admitted {
                    trace!("🚧 skipping {} ({} bytes)", object.key, object.size);
                }
                admitted
            })
            .collect();

        match page.next_cursor {
            Some(next) if self.cursor.as_deref() == Some(next.as_str()) => {
                bail!(
                    "💀 listing of {} handed back the same cursor twice ('{}'), refusing to loop forever",
                    self.location,
                    next
                );
            }
            Some(next) => self.cursor = Some(next),
            None => self.exhausted = true,
        }

        debug!(
            "📄 page from {}: {} listed, {} candidates, more: {}",
            self.location,
            listed,
            candidates.len(),
            !self.exhausted
        );
        Ok(Some(ListedPage {
            candidates,
            listed,
            has_more: !self.exhausted,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::{InMemoryStore, ObjectPage};
    use crate::filters::TimeWindow;
    use async_trait::async_trait;

    fn logs() -> BucketLocation {
        BucketLocation {
            bucket: "logs".into(),
            region: "us-east-1".into(),
        }
    }

    fn no_limits() -> ObjectFilter {
        ObjectFilter {
            max_object_size_bytes: u64::MAX,
            window: TimeWindow::default(),
        }
    }

    #[tokio::test]
    async fn the_one_where_pages_arrive_until_the_bucket_runs_dry() -> Result<()> {
        let store = InMemoryStore::new()
            .with_object("logs", "a", "1", 0)
            .with_object("logs", "b", "2", 0)
            .with_object("logs", "c", "3", 0);
        let location = logs();
        let mut lister = ObjectLister::new(&store, &location, no_limits(), 2);

        let first = lister.next_page().await?.expect("💀 first page went missing");
        assert_eq!(first.listed, 2);
        assert!(first.has_more);
        let second = lister.next_page().await?.expect("💀 second page went missing");
        assert_eq!(second.candidates, vec![ObjectDescriptor::new("c", 1, 0)]);
        assert!(!second.has_more);
        assert_eq!(lister.next_page().await?, None);
        assert_eq!(store.list_calls(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_the_bouncer_checks_every_entry() -> Result<()> {
        let store = InMemoryStore::new()
            .with_object("logs", "fits", vec![0u8; 10], 150)
            .with_object("logs", "chonk", vec![0u8; 11], 150)
            .with_object("logs", "stale", vec![0u8; 1], 50);
        let location = logs();
        let filter = ObjectFilter {
            max_object_size_bytes: 10,
            window: TimeWindow {
                start: 100,
                end: 200,
            },
        };
        let mut lister = ObjectLister::new(&store, &location, filter, 10);

        let page = lister.next_page().await?.expect("💀 page went missing");
        assert_eq!(page.listed, 3);
        assert_eq!(page.candidates, vec![ObjectDescriptor::new("fits", 10, 150)]);
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_an_empty_bucket_still_makes_one_page() -> Result<()> {
        let store = InMemoryStore::new().with_bucket("logs");
        let location = logs();
        let mut lister = ObjectLister::new(&store, &location, no_limits(), 10);

        let page = lister.next_page().await?.expect("💀 page went missing");
        assert_eq!(page, ListedPage::default());
        assert_eq!(lister.next_page().await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_listing_errors_come_straight_back() {
        let store = InMemoryStore::new().with_bucket("logs").with_broken_listing();
        let location = logs();
        let mut lister = ObjectLister::new(&store, &location, no_limits(), 10);
        assert!(lister.next_page().await.is_err());
    }

    #[derive(Debug)]
    struct StuckStore;

    #[async_trait]
    impl ObjectStore for StuckStore {
        async fn head_bucket(&self, _location: &BucketLocation) -> Result<()> {
            Ok(())
        }

        async fn list_page(
            &self,
            _location: &BucketLocation,
            _cursor: Option<&str>,
            _max_keys: usize,
        ) -> Result<ObjectPage> {
            Ok(ObjectPage {
                objects: vec![],
                next_cursor: Some("same-old".into()),
            })
        }

        async fn fetch(
            &self,
            _location: &BucketLocation,
            _key: &str,
            _size: u64,
        ) -> Result<crate::backends::ByteChunks> {
            bail!("💀 nothing to fetch here")
        }
    }

    #[tokio::test]
    async fn the_one_where_a_stuck_cursor_does_not_spin_forever() {
        let location = logs();
        let mut lister = ObjectLister::new(&StuckStore, &location, no_limits(), 10);
        assert!(lister.next_page().await.is_ok());
        assert!(lister.next_page().await.is_err());
    }
}
