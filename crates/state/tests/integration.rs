//! Integration tests for the store

#[cfg(test)]
mod tests {
    use roller_state::queries::{activity, catalog, groups, instances, stats};
    use roller_state::*;
    use roller_types::{
        ActivityClass, ActivityQuery, ActivitySeverity, CoreosAction, GroupPolicy,
        InstanceStatus, InstancesQuery, NewActivity, NewChannel, NewGroup, NewPackage,
        PackageKind, Page,
    };
    use sqlx::{Pool, Sqlite};
    use tempfile::{tempdir, TempDir};

    const APP: &str = "e96281a6-d1af-4bde-9a0a-97b76e56dc57";
    const GROUP: &str = "5b810680-e36a-4879-b98a-4f989e80b899";
    const CHANNEL: &str = "e06064ad-4414-4904-9a6e-fd465593d1b2";
    const PACKAGE: &str = "84b4c599-9b6e-44a8-b1c4-3a2b2c1b1a0c";

    async fn setup() -> (Pool<Sqlite>, TempDir) {
        let temp_dir = tempdir().unwrap();
        let pool = create_pool(&temp_dir.path().join("roller.sqlite"))
            .await
            .unwrap();
        run_migrations(&pool).await.unwrap();

        let mut conn = pool.acquire().await.unwrap();
        let now = now_millis();
        catalog::insert_application(&mut conn, APP, "app", "", now)
            .await
            .unwrap();
        catalog::insert_package(
            &mut conn,
            PACKAGE,
            &NewPackage {
                application_id: APP.to_string(),
                version: "2.0.0".to_string(),
                url: "https://updates.example.com/".to_string(),
                filename: Some("update.gz".to_string()),
                description: None,
                size: Some("1024".to_string()),
                hash: None,
                kind: PackageKind::Coreos(CoreosAction {
                    sha256: "c2hh".to_string(),
                    ..CoreosAction::default()
                }),
                channels_blacklist: Vec::new(),
            },
            now,
        )
        .await
        .unwrap();
        catalog::insert_channel(
            &mut conn,
            CHANNEL,
            &NewChannel {
                name: "stable".to_string(),
                color: "#00ff00".to_string(),
                application_id: APP.to_string(),
                package_id: Some(PACKAGE.to_string()),
            },
            now,
        )
        .await
        .unwrap();
        groups::insert_group(
            &mut conn,
            GROUP,
            &NewGroup {
                name: "prod".to_string(),
                description: String::new(),
                application_id: APP.to_string(),
                channel_id: Some(CHANNEL.to_string()),
                policy: GroupPolicy::default(),
            },
            now,
        )
        .await
        .unwrap();
        drop(conn);
        (pool, temp_dir)
    }

    async fn register(pool: &Pool<Sqlite>, instance: &str, version: &str, now: i64) {
        let mut tx = pool.begin().await.unwrap();
        instances::upsert_instance(&mut tx, instance, "10.0.0.1", now)
            .await
            .unwrap();
        instances::upsert_instance_application(&mut tx, instance, APP, GROUP, version, now)
            .await
            .unwrap();
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_load_group_with_channel_and_package() {
        let (pool, _dir) = setup().await;
        let mut conn = pool.acquire().await.unwrap();

        let group = groups::load_group(&mut conn, GROUP, 0)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(group.policy, GroupPolicy::default());
        let channel = group.channel.unwrap();
        let package = channel.package.unwrap();
        assert_eq!(package.version, "2.0.0");
        assert_eq!(package.kind.coreos_action().unwrap().sha256, "c2hh");
        assert!(package.channels_blacklist.is_empty());
    }

    #[tokio::test]
    async fn test_upsert_refreshes_ip_and_version() {
        let (pool, _dir) = setup().await;
        let now = now_millis();
        register(&pool, "instance-1", "1.0.0", now).await;

        let mut conn = pool.acquire().await.unwrap();
        instances::upsert_instance(&mut conn, "instance-1", "10.0.0.2", now + 5)
            .await
            .unwrap();
        instances::upsert_instance_application(
            &mut conn,
            "instance-1",
            APP,
            GROUP,
            "1.0.1",
            now + 5,
        )
        .await
        .unwrap();

        let instance = instances::get_instance(&mut conn, "instance-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(instance.ip, "10.0.0.2");
        assert_eq!(instance.created_ts, now);
        let app = instances::get_instance_application(&mut conn, "instance-1", APP, 0)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(app.version, "1.0.1");
        assert_eq!(app.last_check_for_updates, now + 5);
        assert_eq!(app.created_ts, now);
    }

    #[tokio::test]
    async fn test_status_update_is_conditional() {
        let (pool, _dir) = setup().await;
        let now = now_millis();
        register(&pool, "instance-1", "1.0.0", now).await;

        let mut conn = pool.acquire().await.unwrap();
        instances::grant_update(&mut conn, "instance-1", APP, "2.0.0", now)
            .await
            .unwrap();

        let changed =
            instances::update_status(&mut conn, "instance-1", APP, InstanceStatus::Complete)
                .await
                .unwrap()
                .unwrap();
        assert_eq!(changed.version, "2.0.0");
        assert_eq!(changed.group_id, GROUP);

        let again =
            instances::update_status(&mut conn, "instance-1", APP, InstanceStatus::Complete)
                .await
                .unwrap();
        assert!(again.is_none());

        let app = instances::get_instance_application(&mut conn, "instance-1", APP, 0)
            .await
            .unwrap()
            .unwrap();
        assert!(!app.update_in_progress);
        assert_eq!(app.status, Some(InstanceStatus::Complete.code()));

        let missing =
            instances::update_status(&mut conn, "nobody", APP, InstanceStatus::Complete)
                .await
                .unwrap();
        assert!(missing.is_none());
        assert!(!instances::instance_application_exists(&mut conn, "nobody", APP)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_updates_stats_windows() {
        let (pool, _dir) = setup().await;
        let now = now_millis();
        for id in ["a", "b", "c", "d"] {
            register(&pool, id, "1.0.0", now).await;
        }
        let mut conn = pool.acquire().await.unwrap();

        // a: granted long ago and still running, b: granted recently,
        // c: granted and completed, d: untouched
        instances::grant_update(&mut conn, "a", APP, "2.0.0", now - 10_000)
            .await
            .unwrap();
        instances::grant_update(&mut conn, "b", APP, "2.0.0", now - 10)
            .await
            .unwrap();
        instances::grant_update(&mut conn, "c", APP, "2.0.0", now - 10)
            .await
            .unwrap();
        instances::update_status(&mut conn, "c", APP, InstanceStatus::Complete)
            .await
            .unwrap();

        let window = StatsWindow {
            now,
            active_since: now - 60_000,
            period_interval: 1_000,
            update_timeout: 5_000,
        };
        let stats = stats::updates_stats(&mut conn, GROUP, "2.0.0", window)
            .await
            .unwrap();
        assert_eq!(stats.total_instances, 4);
        assert_eq!(stats.granted_current_version, 3);
        assert_eq!(stats.attempted_current_version, 1);
        assert_eq!(stats.succeeded_current_version, 1);
        assert_eq!(stats.failed_current_version, 0);
        assert_eq!(stats.granted_in_period, 2);
        assert_eq!(stats.in_progress, 1);
        assert_eq!(stats.timed_out, 1);

        // Inactive instances drop out of every counter
        let stale = StatsWindow {
            active_since: now,
            ..window
        };
        let stats = stats::updates_stats(&mut conn, GROUP, "2.0.0", stale)
            .await
            .unwrap();
        assert_eq!(stats, roller_types::UpdatesStats::default());
    }

    #[tokio::test]
    async fn test_status_counts_and_version_breakdown() {
        let (pool, _dir) = setup().await;
        let now = now_millis();
        register(&pool, "a", "1.0.0", now).await;
        register(&pool, "b", "1.0.0", now).await;
        register(&pool, "c", "1.10.0", now).await;
        register(&pool, "d", "1.9.0", now).await;

        let mut conn = pool.acquire().await.unwrap();
        instances::update_status(&mut conn, "a", APP, InstanceStatus::OnHold)
            .await
            .unwrap();

        let group = groups::load_group(&mut conn, GROUP, now - 1)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(group.instances_stats.total, 4);
        assert_eq!(group.instances_stats.on_hold, 1);
        assert_eq!(group.instances_stats.undefined, 3);

        let versions: Vec<_> = group
            .version_breakdown
            .iter()
            .map(|entry| (entry.version.as_str(), entry.instances))
            .collect();
        assert_eq!(versions, vec![("1.10.0", 1), ("1.9.0", 1), ("1.0.0", 2)]);
        assert!((group.version_breakdown[2].percentage - 50.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_status_history_newest_first() {
        let (pool, _dir) = setup().await;
        let now = now_millis();
        register(&pool, "a", "1.0.0", now).await;
        let mut conn = pool.acquire().await.unwrap();

        for (offset, status) in [
            (0, InstanceStatus::UpdateGranted),
            (1, InstanceStatus::Downloading),
            (2, InstanceStatus::Complete),
        ] {
            instances::insert_status_history(
                &mut conn,
                "a",
                APP,
                GROUP,
                status,
                "2.0.0",
                now + offset,
            )
            .await
            .unwrap();
        }

        let rows = instances::get_status_history(&mut conn, "a", APP, GROUP, 2)
            .await
            .unwrap();
        let statuses: Vec<_> = rows
            .into_iter()
            .filter_map(|row| row.into_entry())
            .map(|entry| entry.status)
            .collect();
        assert_eq!(
            statuses,
            vec![InstanceStatus::Complete, InstanceStatus::Downloading]
        );
    }

    #[tokio::test]
    async fn test_list_instances_filters_and_pages() {
        let (pool, _dir) = setup().await;
        let now = now_millis();
        for (i, id) in ["a", "b", "c"].iter().enumerate() {
            register(&pool, id, if i == 0 { "1.0.0" } else { "1.1.0" }, now + i as i64).await;
        }
        let mut conn = pool.acquire().await.unwrap();

        let mut filter = InstancesQuery {
            application_id: APP.to_string(),
            group_id: GROUP.to_string(),
            page: Page::new(1, 2),
            ..InstancesQuery::default()
        };
        let first = instances::list_instances(&mut conn, &filter, 0).await.unwrap();
        assert_eq!(first.len(), 2);
        filter.page = Page::new(2, 2);
        let second = instances::list_instances(&mut conn, &filter, 0).await.unwrap();
        assert_eq!(second.len(), 1);

        filter.page = Page::default();
        filter.version = Some("1.1.0".to_string());
        let filtered = instances::list_instances(&mut conn, &filter, 0).await.unwrap();
        assert_eq!(filtered.len(), 2);
        assert!(filtered.iter().all(|row| row.application.version == "1.1.0"));
    }

    #[tokio::test]
    async fn test_activity_query_filters() {
        let (pool, _dir) = setup().await;
        let now = now_millis();
        let mut conn = pool.acquire().await.unwrap();

        activity::insert_activity(
            &mut conn,
            &NewActivity::new(
                ActivityClass::RolloutStarted,
                ActivitySeverity::Info,
                "2.0.0",
                APP,
            )
            .group(GROUP)
            .channel(Some(CHANNEL.to_string())),
            now,
        )
        .await
        .unwrap();
        activity::insert_activity(
            &mut conn,
            &NewActivity::new(
                ActivityClass::PackageNotFound,
                ActivitySeverity::Warning,
                "0.0.0",
                APP,
            )
            .group(GROUP),
            now + 1,
        )
        .await
        .unwrap();

        let all = activity::query_activity(&mut conn, &ActivityQuery::default(), 0, now + 10)
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
        let newest = all[0].clone().into_activity().unwrap();
        assert_eq!(newest.class, ActivityClass::PackageNotFound);
        assert_eq!(newest.group_name.as_deref(), Some("prod"));
        let oldest = all[1].clone().into_activity().unwrap();
        assert_eq!(oldest.channel_name.as_deref(), Some("stable"));

        let warnings = activity::query_activity(
            &mut conn,
            &ActivityQuery {
                severity: Some(ActivitySeverity::Warning),
                ..ActivityQuery::default()
            },
            0,
            now + 10,
        )
        .await
        .unwrap();
        assert_eq!(warnings.len(), 1);

        let out_of_range = activity::query_activity(&mut conn, &ActivityQuery::default(), 0, now - 1)
            .await
            .unwrap();
        assert!(out_of_range.is_empty());
    }

    #[tokio::test]
    async fn test_group_flags_report_transitions() {
        let (pool, _dir) = setup().await;
        let mut conn = pool.acquire().await.unwrap();

        assert!(groups::set_rollout_in_progress(&mut conn, GROUP, true)
            .await
            .unwrap());
        assert!(!groups::set_rollout_in_progress(&mut conn, GROUP, true)
            .await
            .unwrap());
        assert!(groups::set_updates_enabled(&mut conn, GROUP, false)
            .await
            .unwrap());
        assert!(!groups::set_updates_enabled(&mut conn, GROUP, false)
            .await
            .unwrap());
    }
}
