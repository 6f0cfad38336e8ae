#[cfg(feature = "mock")]
mod mock_tests {
    use chrono::{TimeZone, Utc};
    use mockall::predicate::*; // for eq(), always(), etc.
    use tracklist_sync::reconcile::plan_mirror_sync;
    use tracklist_sync::{
        saved_tracks, Album, AsyncPaginatedIterator, BatchLimits, CatalogClient, CollectionRef,
        ExternalUrls, ListEntry, MockCatalogClient, Page, Result, Track, User,
    };

    fn track(id: &str) -> Track {
        Track {
            id: id.to_string(),
            uri: format!("spotify:track:{id}"),
            name: id.to_string(),
            artists: vec![],
            album: Album {
                id: "al".to_string(),
                uri: "spotify:album:al".to_string(),
                name: "Album".to_string(),
                artists: vec![],
                images: vec![],
                release_date: None,
                total_tracks: None,
                external_urls: ExternalUrls::default(),
            },
            external_urls: ExternalUrls::default(),
        }
    }

    #[tokio::test]
    async fn test_mock_as_trait_object() -> Result<()> {
        let mut mock_client = MockCatalogClient::new();

        mock_client.expect_authorize().times(1).returning(|| Ok(()));
        mock_client.expect_current_user().times(1).returning(|| {
            Ok(User {
                id: "me".to_string(),
                uri: "spotify:user:me".to_string(),
                display_name: Some("Me".to_string()),
                external_urls: ExternalUrls::default(),
            })
        });

        // Use the mock as a trait object
        let client: &dyn CatalogClient = &mock_client;

        client.authorize().await?;
        assert_eq!(client.current_user().await?.name(), "Me");

        Ok(())
    }

    #[tokio::test]
    async fn test_mock_drives_listing_and_plan() -> Result<()> {
        let mut mock_client = MockCatalogClient::new();
        let added = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        mock_client
            .expect_batch_limits()
            .return_const(BatchLimits::default());
        mock_client.expect_saved_tracks_page().returning(move |request| {
            Ok(if request.offset == Some(0) {
                Page::new(vec![
                    ListEntry::new(track("a"), added, CollectionRef::Library),
                    ListEntry::new(track("b"), added, CollectionRef::Library),
                ])
            } else {
                Page::new(vec![])
            })
        });
        mock_client
            .expect_add_playlist_tracks()
            .with(eq("mirror"), always())
            .times(1)
            .returning(|_, uris| {
                assert_eq!(uris, ["spotify:track:b".to_string()]);
                Ok(())
            });

        let saved = saved_tracks(&mock_client, None).collect_all().await?;
        let mirror = vec![ListEntry::new(
            track("a"),
            added,
            CollectionRef::Playlist("mirror".to_string()),
        )];

        let plan = plan_mirror_sync(&saved, &mirror, "mirror");
        assert_eq!(plan.apply(&mock_client).await?, 1);

        Ok(())
    }
}
