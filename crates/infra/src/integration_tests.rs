//! Integration tests for the catalog pipeline over the in-memory store.
//!
//! Tests: payload → CatalogCommitter → store → CatalogReader / CatalogArchiver
//!
//! Verifies:
//! - Variant expansion order, SKUs, summaries and bridge counts
//! - All-or-nothing commits (conflicts, validation, injected faults)
//! - Archive cascade order and monotonic archival
//! - Edits, reads and post-commit notifications, with and without a tokio
//!   runtime

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use forgecart_catalog::{
        CatalogCreation, CatalogEvent, OptionCreation, ProductDraft, ProductPatch,
    };
    use forgecart_core::{Entity, ProductId, ProductOptionId, ProductRootId};
    use forgecart_events::{EventBus, EventEnvelope, InMemoryEventBus, Subscription};
    use serde_json::json;

    use crate::archive::{ArchiveTarget, CatalogArchiver};
    use crate::commit::CatalogCommitter;
    use crate::config::CatalogConfig;
    use crate::edit::CatalogEditor;
    use crate::error::CatalogError;
    use crate::read::CatalogReader;
    use crate::service::CatalogService;
    use crate::store::{
        EntityKind, FailPoint, InMemoryCatalogStore, StoreStats, WriteAction, WriteOp,
    };

    type Bus = InMemoryEventBus<EventEnvelope<CatalogEvent>>;

    fn draft(sku: &str) -> ProductDraft {
        serde_json::from_value(json!({
            "name": "T-Shirt",
            "description": "Plain cotton tee",
            "sku": sku,
            "quantity": 10,
            "taxable": true,
            "price": 1999,
            "cost": 700,
        }))
        .unwrap()
    }

    fn shirt() -> CatalogCreation {
        CatalogCreation::new(draft("shirt"))
            .with_option("Size", ["Small", "Medium", "Large"])
            .with_option("Color", ["Red", "Blue"])
    }

    fn mug() -> CatalogCreation {
        CatalogCreation::new(draft("mug"))
    }

    fn stats(store: &InMemoryCatalogStore) -> StoreStats {
        store.stats().unwrap()
    }

    fn kinds(journal: &[WriteOp], action: WriteAction) -> Vec<EntityKind> {
        journal
            .iter()
            .filter(|op| op.action == action)
            .map(|op| op.kind)
            .collect()
    }

    /// Poll without awaiting, for callers that are not on a runtime.
    fn wait_for_event(
        subscription: &mut Subscription<EventEnvelope<CatalogEvent>>,
    ) -> EventEnvelope<CatalogEvent> {
        let deadline = Instant::now() + Duration::from_secs(1);
        loop {
            if let Some(event) = subscription.try_recv().unwrap() {
                return event;
            }
            assert!(Instant::now() < deadline, "no event published");
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[tokio::test]
    async fn shirt_expands_to_six_variants_in_odometer_order() {
        let store = InMemoryCatalogStore::new();
        let committer = CatalogCommitter::new(store.clone());

        let graph = committer.commit_catalog(&shirt()).await.unwrap();

        let skus: Vec<&str> = graph.products.iter().map(|p| p.sku.as_str()).collect();
        assert_eq!(
            skus,
            vec![
                "shirt_small_red",
                "shirt_small_blue",
                "shirt_medium_red",
                "shirt_medium_blue",
                "shirt_large_red",
                "shirt_large_blue",
            ]
        );
        assert_eq!(graph.products[0].option_summary, "Size: Small, Color: Red");
        assert_eq!(graph.products[5].option_summary, "Size: Large, Color: Blue");
        assert_eq!(graph.root.sku_prefix, "shirt");
        assert_eq!(graph.options.len(), 2);
        assert_eq!(graph.option_values().count(), 5);

        let values: Vec<&str> = graph.products[3]
            .applicable_option_values
            .iter()
            .map(|v| v.value.as_str())
            .collect();
        assert_eq!(values, vec!["Medium", "Blue"]);

        let stats = stats(&store);
        assert_eq!(stats.product_roots, 1);
        assert_eq!(stats.product_options, 2);
        assert_eq!(stats.product_option_values, 5);
        assert_eq!(stats.products, 6);
        assert_eq!(stats.variant_bridges, 12);
    }

    #[tokio::test]
    async fn rows_are_created_root_then_options_then_variants() {
        let store = InMemoryCatalogStore::new();
        CatalogCommitter::new(store.clone())
            .commit_catalog(&shirt())
            .await
            .unwrap();

        let created = kinds(&store.journal().unwrap(), WriteAction::Created);
        let mut expected = vec![
            EntityKind::ProductRoot,
            EntityKind::ProductOption,
            EntityKind::ProductOptionValue,
            EntityKind::ProductOptionValue,
            EntityKind::ProductOptionValue,
            EntityKind::ProductOption,
            EntityKind::ProductOptionValue,
            EntityKind::ProductOptionValue,
        ];
        for _ in 0..6 {
            expected.push(EntityKind::Product);
            expected.push(EntityKind::VariantBridge);
            expected.push(EntityKind::VariantBridge);
        }
        assert_eq!(created, expected);
    }

    #[tokio::test]
    async fn mug_without_options_gets_one_base_variant() {
        let store = InMemoryCatalogStore::new();
        let graph = CatalogCommitter::new(store.clone())
            .commit_catalog(&mug())
            .await
            .unwrap();

        assert_eq!(graph.products.len(), 1);
        let variant = &graph.products[0];
        assert_eq!(variant.sku, "mug");
        assert_eq!(variant.option_summary, "");
        assert_eq!(variant.quantity_per_package, 1);
        assert!(variant.applicable_option_values.is_empty());
        assert!(graph.options.is_empty());

        let stats = stats(&store);
        assert_eq!(stats.products, 1);
        assert_eq!(stats.variant_bridges, 0);
    }

    #[tokio::test]
    async fn variant_and_bridge_counts_follow_value_counts() {
        let shapes: &[&[usize]] = &[&[1], &[4], &[2, 2], &[1, 3, 2], &[3, 1, 1, 2]];

        for (n, shape) in shapes.iter().enumerate() {
            let store = InMemoryCatalogStore::new();
            let mut payload = CatalogCreation::new(draft(&format!("item-{n}")));
            for (i, &count) in shape.iter().enumerate() {
                payload = payload.with_option(
                    format!("Option{i}"),
                    (0..count).map(|v| format!("v{v}")),
                );
            }

            let graph = CatalogCommitter::new(store.clone())
                .commit_catalog(&payload)
                .await
                .unwrap();

            let variants: usize = shape.iter().product();
            assert_eq!(graph.products.len(), variants, "shape {shape:?}");
            assert_eq!(stats(&store).variant_bridges, shape.len() * variants);
        }
    }

    #[tokio::test]
    async fn taken_prefix_is_a_conflict_and_writes_nothing() {
        let store = InMemoryCatalogStore::new();
        let committer = CatalogCommitter::new(store.clone());
        committer.commit_catalog(&shirt()).await.unwrap();
        let before = store.journal().unwrap().len();

        let err = committer.commit_catalog(&shirt()).await.unwrap_err();

        assert!(matches!(err, CatalogError::Conflict(ref msg) if msg.contains("shirt")));
        assert_eq!(store.journal().unwrap().len(), before);
        assert_eq!(stats(&store).product_roots, 1);
    }

    #[tokio::test]
    async fn duplicate_option_name_rolls_back_everything() {
        let store = InMemoryCatalogStore::new();
        let payload = CatalogCreation::new(draft("shirt"))
            .with_option("Size", ["Small"])
            .with_option("Size", ["Large"]);

        let err = CatalogCommitter::new(store.clone())
            .commit_catalog(&payload)
            .await
            .unwrap_err();

        assert!(matches!(err, CatalogError::Conflict(_)));
        assert_eq!(stats(&store).total_rows(), 0);
    }

    #[tokio::test]
    async fn duplicate_option_value_rolls_back_everything() {
        let store = InMemoryCatalogStore::new();
        let payload = CatalogCreation::new(draft("shirt")).with_option("Size", ["Small", "Small"]);

        let err = CatalogCommitter::new(store.clone())
            .commit_catalog(&payload)
            .await
            .unwrap_err();

        assert!(matches!(err, CatalogError::Conflict(_)));
        assert_eq!(stats(&store).total_rows(), 0);
    }

    #[tokio::test]
    async fn malformed_payloads_fail_validation_without_writes() {
        let store = InMemoryCatalogStore::new();
        let committer = CatalogCommitter::new(store.clone()).with_max_variants(Some(4));

        let bad_sku = CatalogCreation::new(draft("t shirt!"));
        let empty_option =
            CatalogCreation::new(draft("shirt")).with_option("Size", Vec::<String>::new());
        let too_many = CatalogCreation::new(draft("shirt"))
            .with_option("Size", ["S", "M", "L"])
            .with_option("Color", ["Red", "Blue"]);

        for payload in [bad_sku, empty_option, too_many] {
            let err = committer.commit_catalog(&payload).await.unwrap_err();
            assert!(matches!(err, CatalogError::Validation(_)), "{err:?}");
        }
        assert!(store.journal().unwrap().is_empty());
    }

    #[tokio::test]
    async fn injected_failures_leave_no_rows() {
        let points = [
            FailPoint::Create(EntityKind::ProductRoot),
            FailPoint::Create(EntityKind::ProductOption),
            FailPoint::Create(EntityKind::ProductOptionValue),
            FailPoint::Create(EntityKind::Product),
            FailPoint::Create(EntityKind::VariantBridge),
            FailPoint::Commit,
        ];

        for point in points {
            let store = InMemoryCatalogStore::new();
            store.fail_on(point);

            let err = CatalogCommitter::new(store.clone())
                .commit_catalog(&shirt())
                .await
                .unwrap_err();

            assert!(matches!(err, CatalogError::Storage(_)), "{point:?}: {err:?}");
            assert_eq!(stats(&store).total_rows(), 0, "{point:?}");
            assert!(store.journal().unwrap().is_empty(), "{point:?}");
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_commits_with_same_prefix_have_one_winner() {
        let store = InMemoryCatalogStore::new();
        let committer = CatalogCommitter::new(store.clone());

        let a = tokio::spawn({
            let committer = committer.clone();
            async move { committer.commit_catalog(&shirt()).await }
        });
        let b = tokio::spawn({
            let committer = committer.clone();
            async move { committer.commit_catalog(&shirt()).await }
        });
        let results = [a.await.unwrap(), b.await.unwrap()];

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(
            results
                .iter()
                .any(|r| matches!(r, Err(CatalogError::Conflict(_))))
        );

        let stats = stats(&store);
        assert_eq!(stats.product_roots, 1);
        assert_eq!(stats.products, 6);
        assert_eq!(stats.variant_bridges, 12);
    }

    #[tokio::test]
    async fn commit_that_loses_the_race_is_a_conflict_and_writes_nothing() {
        let store = InMemoryCatalogStore::new();
        let committer = CatalogCommitter::new(store.clone());

        // Both transactions snapshot before either commits, so both pass the
        // prefix pre-check and the loser is stopped by the commit-time check.
        let (shirt_a, shirt_b) = (shirt(), shirt());
        let (a, b) = tokio::join!(
            committer.commit_catalog(&shirt_a),
            committer.commit_catalog(&shirt_b)
        );
        let loser = match (a, b) {
            (Ok(_), Err(err)) | (Err(err), Ok(_)) => err,
            other => panic!("expected exactly one winner, got {other:?}"),
        };

        let at_commit = matches!(
            &loser,
            CatalogError::Conflict(msg) if msg.contains("product_roots_sku_prefix_key")
        );
        assert!(at_commit, "{loser:?}");
        let created = kinds(&store.journal().unwrap(), WriteAction::Created);
        assert_eq!(
            created
                .iter()
                .filter(|kind| **kind == EntityKind::ProductRoot)
                .count(),
            1
        );
        assert_eq!(stats(&store).total_rows(), 1 + 2 + 5 + 6 + 12);
    }

    #[tokio::test]
    async fn archiving_a_root_cascades_children_first() {
        let store = InMemoryCatalogStore::new();
        let graph = CatalogCommitter::new(store.clone())
            .commit_catalog(&shirt())
            .await
            .unwrap();
        let committed = store.journal().unwrap().len();

        let archiver = CatalogArchiver::new(store.clone());
        let archived_on = archiver
            .archive_catalog(ArchiveTarget::Root(graph.root.id))
            .await
            .unwrap();

        let journal = store.journal().unwrap();
        let archived = kinds(&journal[committed..], WriteAction::Archived);
        let mut expected = vec![EntityKind::VariantBridge; 12];
        expected.extend([EntityKind::Product; 6]);
        expected.extend([EntityKind::ProductOptionValue; 5]);
        expected.extend([EntityKind::ProductOption; 2]);
        expected.push(EntityKind::ProductRoot);
        assert_eq!(archived, expected);
        assert_eq!(stats(&store).archived, stats(&store).total_rows());

        let err = CatalogReader::new(store.clone())
            .root_graph(graph.root.id)
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(_)));
        assert!(archived_on >= graph.root.lifecycle.created_on);
    }

    #[tokio::test]
    async fn archiving_twice_is_not_found_and_writes_nothing() {
        let store = InMemoryCatalogStore::new();
        let graph = CatalogCommitter::new(store.clone())
            .commit_catalog(&mug())
            .await
            .unwrap();
        let archiver = CatalogArchiver::new(store.clone());

        archiver.archive_catalog(graph.root.id.into()).await.unwrap();
        let after_first = store.journal().unwrap();

        let err = archiver.archive_catalog(graph.root.id.into()).await.unwrap_err();

        assert!(matches!(err, CatalogError::NotFound(_)));
        assert_eq!(store.journal().unwrap(), after_first);
    }

    #[tokio::test]
    async fn archive_failures_leave_nothing_archived() {
        let root_cascade = [
            EntityKind::ProductRoot,
            EntityKind::ProductOption,
            EntityKind::ProductOptionValue,
            EntityKind::Product,
            EntityKind::VariantBridge,
        ];
        let variant_cascade = [EntityKind::Product, EntityKind::VariantBridge];

        let targets = root_cascade
            .into_iter()
            .map(|kind| (kind, true))
            .chain(variant_cascade.into_iter().map(|kind| (kind, false)));

        for (kind, whole_root) in targets {
            let store = InMemoryCatalogStore::new();
            let graph = CatalogCommitter::new(store.clone())
                .commit_catalog(&shirt())
                .await
                .unwrap();
            let before = store.journal().unwrap();
            let target = if whole_root {
                ArchiveTarget::Root(graph.root.id)
            } else {
                ArchiveTarget::Variant(graph.products[0].id)
            };

            store.fail_on(FailPoint::Archive(kind));
            let err = CatalogArchiver::new(store.clone())
                .archive_catalog(target)
                .await
                .unwrap_err();

            assert!(matches!(err, CatalogError::Storage(_)), "{target:?} at {kind:?}: {err:?}");
            assert_eq!(store.journal().unwrap(), before, "{target:?} at {kind:?}");
            assert_eq!(stats(&store).archived, 0, "{target:?} at {kind:?}");

            let live = CatalogReader::new(store.clone())
                .root_graph(graph.root.id)
                .await
                .unwrap();
            assert_eq!(live.products.len(), 6);
        }
    }

    #[tokio::test]
    async fn edit_failures_leave_rows_untouched() {
        let store = InMemoryCatalogStore::new();
        let graph = CatalogCommitter::new(store.clone())
            .commit_catalog(&shirt())
            .await
            .unwrap();
        let editor = CatalogEditor::new(store.clone());
        let before = store.journal().unwrap();
        let product = &graph.products[0];
        let size = &graph.options[0];

        store.fail_on(FailPoint::Update(EntityKind::Product));
        let patch: ProductPatch = serde_json::from_value(json!({ "price": 1 })).unwrap();
        let err = editor.update_product(product.id, &patch).await.unwrap_err();
        assert!(matches!(err, CatalogError::Storage(_)), "{err:?}");

        store.fail_on(FailPoint::Update(EntityKind::ProductOption));
        let err = editor.rename_option(size.id, "Fit").await.unwrap_err();
        assert!(matches!(err, CatalogError::Storage(_)), "{err:?}");

        store.fail_on(FailPoint::Update(EntityKind::ProductOptionValue));
        let err = editor
            .update_option_value(size.values[0].id, "Petite")
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Storage(_)), "{err:?}");

        assert_eq!(store.journal().unwrap(), before);
        let stored = CatalogReader::new(store.clone())
            .root_graph(graph.root.id)
            .await
            .unwrap();
        assert_eq!(stored.products[0].price, product.price);
        assert_eq!(stored.products[0].lifecycle.updated_on, None);
        assert_eq!(stored.options[0].name, "Size");
        assert_eq!(stored.options[0].values[0].value, "Small");
    }

    #[tokio::test]
    async fn missing_targets_are_not_found() {
        let archiver = CatalogArchiver::new(InMemoryCatalogStore::new());

        for target in [
            ArchiveTarget::Root(ProductRootId::new(404)),
            ArchiveTarget::Variant(ProductId::new(404)),
        ] {
            let err = archiver.archive_catalog(target).await.unwrap_err();
            assert!(matches!(err, CatalogError::NotFound(_)), "{target:?}");
        }
        let err = archiver.archive_option(ProductOptionId::new(404)).await.unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(_)));
    }

    #[tokio::test]
    async fn archiving_a_variant_leaves_its_siblings() {
        let store = InMemoryCatalogStore::new();
        let graph = CatalogCommitter::new(store.clone())
            .commit_catalog(&shirt())
            .await
            .unwrap();
        let target = graph.products[0].id;
        let committed = store.journal().unwrap().len();

        CatalogArchiver::new(store.clone())
            .archive_catalog(ArchiveTarget::Variant(target))
            .await
            .unwrap();

        let journal = store.journal().unwrap();
        assert_eq!(
            kinds(&journal[committed..], WriteAction::Archived),
            vec![
                EntityKind::VariantBridge,
                EntityKind::VariantBridge,
                EntityKind::Product
            ]
        );

        let reader = CatalogReader::new(store.clone());
        let live = reader.root_graph(graph.root.id).await.unwrap();
        assert_eq!(live.products.len(), 5);
        assert!(live.product_by_sku("shirt_small_red").is_none());
        assert!(reader.sku_exists("shirt_small_red").await.unwrap());
        assert!(matches!(
            reader.product_by_sku("shirt_small_red").await,
            Err(CatalogError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn archiving_an_option_detaches_it_from_variants() {
        let store = InMemoryCatalogStore::new();
        let graph = CatalogCommitter::new(store.clone())
            .commit_catalog(&shirt())
            .await
            .unwrap();
        let color = &graph.options[1];
        let committed = store.journal().unwrap().len();

        CatalogArchiver::new(store.clone())
            .archive_option(color.id)
            .await
            .unwrap();

        let journal = store.journal().unwrap();
        let archived = kinds(&journal[committed..], WriteAction::Archived);
        let mut expected = vec![EntityKind::VariantBridge; 6];
        expected.extend([EntityKind::ProductOptionValue; 2]);
        expected.push(EntityKind::ProductOption);
        assert_eq!(archived, expected);

        let live = CatalogReader::new(store.clone())
            .root_graph(graph.root.id)
            .await
            .unwrap();
        assert_eq!(live.options.len(), 1);
        assert_eq!(live.products.len(), 6);
        assert!(
            live.products
                .iter()
                .all(|p| p.applicable_option_values.len() == 1)
        );
    }

    #[tokio::test]
    async fn archiving_a_value_only_touches_its_bridges() {
        let store = InMemoryCatalogStore::new();
        let graph = CatalogCommitter::new(store.clone())
            .commit_catalog(&shirt())
            .await
            .unwrap();
        let small = graph.options[0].values[0].id;
        let committed = store.journal().unwrap().len();

        CatalogArchiver::new(store.clone())
            .archive_option_value(small)
            .await
            .unwrap();

        let journal = store.journal().unwrap();
        assert_eq!(
            kinds(&journal[committed..], WriteAction::Archived),
            vec![
                EntityKind::VariantBridge,
                EntityKind::VariantBridge,
                EntityKind::ProductOptionValue
            ]
        );
    }

    #[tokio::test]
    async fn options_and_values_can_be_added_later() {
        let store = InMemoryCatalogStore::new();
        let committer = CatalogCommitter::new(store.clone());
        let graph = committer.commit_catalog(&mug()).await.unwrap();

        let option = committer
            .add_option(
                graph.root.id,
                &OptionCreation {
                    name: "Finish".to_string(),
                    values: vec!["Matte".to_string(), "Gloss".to_string()],
                },
            )
            .await
            .unwrap();
        assert_eq!(option.values.len(), 2);

        let value = committer.add_option_value(option.id, "Satin").await.unwrap();
        assert_eq!(value.product_option_id, option.id);

        let dup = committer.add_option_value(option.id, "Gloss").await.unwrap_err();
        assert!(matches!(dup, CatalogError::Conflict(_)));

        let dup = committer
            .add_option(
                graph.root.id,
                &OptionCreation {
                    name: "Finish".to_string(),
                    values: vec!["Raw".to_string()],
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(dup, CatalogError::Conflict(_)));

        let live = CatalogReader::new(store.clone())
            .root_graph(graph.root.id)
            .await
            .unwrap();
        assert_eq!(live.option_values().count(), 3);
        assert_eq!(live.products.len(), 1);
    }

    #[tokio::test]
    async fn variant_update_keeps_sku_and_stamps_updated_on() {
        let store = InMemoryCatalogStore::new();
        let graph = CatalogCommitter::new(store.clone())
            .commit_catalog(&shirt())
            .await
            .unwrap();
        let target = &graph.products[2];

        let patch: ProductPatch =
            serde_json::from_value(json!({ "price": 2499, "on_sale": true, "sale_price": 1999 }))
                .unwrap();
        let updated = CatalogEditor::new(store.clone())
            .update_product(target.id, &patch)
            .await
            .unwrap();

        assert_eq!(updated.sku, target.sku);
        assert_eq!(updated.option_summary, target.option_summary);
        assert_eq!(updated.price, 2499);
        assert!(updated.lifecycle.updated_on.is_some());
        assert_eq!(updated.applicable_option_values.len(), 2);

        let stored = CatalogReader::new(store.clone())
            .product_by_sku(&target.sku)
            .await
            .unwrap();
        assert_eq!(stored.price, 2499);
        assert_eq!(stored.sale_price, Some(1999));
        assert!(stored.is_live());
    }

    #[tokio::test]
    async fn updating_an_archived_variant_is_not_found() {
        let store = InMemoryCatalogStore::new();
        let graph = CatalogCommitter::new(store.clone())
            .commit_catalog(&mug())
            .await
            .unwrap();
        let id = graph.products[0].id;
        CatalogArchiver::new(store.clone())
            .archive_catalog(id.into())
            .await
            .unwrap();

        let patch: ProductPatch = serde_json::from_value(json!({ "quantity": 3 })).unwrap();
        let err = CatalogEditor::new(store.clone())
            .update_product(id, &patch)
            .await
            .unwrap_err();

        assert!(matches!(err, CatalogError::NotFound(_)));
    }

    #[tokio::test]
    async fn renames_recheck_uniqueness() {
        let store = InMemoryCatalogStore::new();
        let graph = CatalogCommitter::new(store.clone())
            .commit_catalog(&shirt())
            .await
            .unwrap();
        let editor = CatalogEditor::new(store.clone());
        let size = &graph.options[0];

        let err = editor.rename_option(size.id, "Color").await.unwrap_err();
        assert!(matches!(err, CatalogError::Conflict(_)));

        let renamed = editor.rename_option(size.id, "Fit").await.unwrap();
        assert_eq!(renamed.name, "Fit");
        assert_eq!(renamed.values.len(), 3);

        let err = editor
            .update_option_value(size.values[0].id, "Medium")
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Conflict(_)));

        let value = editor
            .update_option_value(size.values[0].id, "Petite")
            .await
            .unwrap();
        assert_eq!(value.value, "Petite");
        assert!(value.lifecycle.updated_on.is_some());
    }

    #[tokio::test]
    async fn service_publishes_events_after_commit() {
        let store = InMemoryCatalogStore::new();
        let bus: Arc<Bus> = Arc::new(InMemoryEventBus::new());
        let mut subscription = bus.subscribe();
        let service = CatalogService::new(store.clone(), Arc::clone(&bus));

        let graph = service.commit_catalog(&shirt()).await.unwrap();
        let created = tokio::time::timeout(Duration::from_secs(1), subscription.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(created.event_type(), "catalog.product_root.created");
        match created.payload() {
            CatalogEvent::ProductRootCreated(event) => {
                assert_eq!(event.product_root_id, graph.root.id);
                assert_eq!(event.skus.len(), 6);
            }
            other => panic!("unexpected event {other:?}"),
        }

        service.archive_catalog(graph.root.id).await.unwrap();
        let archived = tokio::time::timeout(Duration::from_secs(1), subscription.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(archived.event_type(), "catalog.product_root.archived");
    }

    #[tokio::test]
    async fn failed_operations_publish_nothing() {
        let store = InMemoryCatalogStore::new();
        let bus: Arc<Bus> = Arc::new(InMemoryEventBus::new());
        let mut subscription = bus.subscribe();
        let service = CatalogService::new(store.clone(), Arc::clone(&bus));

        let err = service
            .archive_catalog(ProductRootId::new(1))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(_)));

        assert!(
            tokio::time::timeout(Duration::from_millis(100), subscription.recv())
                .await
                .is_err()
        );
    }

    #[test]
    fn service_works_without_a_tokio_runtime() {
        let store = InMemoryCatalogStore::new();
        let bus: Arc<Bus> = Arc::new(InMemoryEventBus::new());
        let mut subscription = bus.subscribe();
        let service = CatalogService::new(store.clone(), Arc::clone(&bus));

        let graph = futures::executor::block_on(service.commit_catalog(&mug())).unwrap();
        assert_eq!(graph.products.len(), 1);

        let created = wait_for_event(&mut subscription);
        assert_eq!(created.event_type(), "catalog.product_root.created");

        futures::executor::block_on(service.archive_catalog(graph.products[0].id)).unwrap();
        let archived = wait_for_event(&mut subscription);
        assert_eq!(archived.event_type(), "catalog.product.archived");
    }

    #[tokio::test]
    async fn configured_variant_limit_applies_to_commits() {
        let config = CatalogConfig::from_lookup(|key| match key {
            "DATABASE_URL" => Some("postgres://localhost/forgecart".to_string()),
            "FORGECART_MAX_VARIANTS" => Some("4".to_string()),
            _ => None,
        })
        .unwrap();
        let store = InMemoryCatalogStore::new();
        let service = CatalogService::from_config(store.clone(), Arc::new(Bus::new()), &config);

        let err = service.commit_catalog(&shirt()).await.unwrap_err();
        assert!(matches!(err, CatalogError::Validation(_)), "{err:?}");
        assert!(store.journal().unwrap().is_empty());

        service.commit_catalog(&mug()).await.unwrap();

        let unbounded = CatalogConfig::from_lookup(|key| match key {
            "DATABASE_URL" => Some("postgres://localhost/forgecart".to_string()),
            "FORGECART_MAX_VARIANTS" => Some("0".to_string()),
            _ => None,
        })
        .unwrap();
        let committer = CatalogCommitter::from_config(store.clone(), &unbounded);
        assert_eq!(committer.max_variants(), None);
    }
}
