use crate::common::{TestApp, identity, routes};

/// Patterned payload large enough to cross several relay buffers.
fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

mod upload {
    use super::*;

    #[tokio::test]
    async fn single_file_round_trips_byte_for_byte() {
        let app = TestApp::spawn().await;
        let user = identity("u1", 2);
        let bytes = payload(10_000);

        let res = app
            .upload_one("photo.png", "image/png", bytes.clone(), &user)
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        let saved = res.body.as_array().unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0]["size"].as_i64().unwrap(), bytes.len() as i64);

        let id = saved[0]["id"].as_str().unwrap();
        let (status, headers, body) = app.download(id).await;
        assert_eq!(status, 200);
        assert_eq!(headers["content-type"].to_str().unwrap(), "image/png");
        assert_eq!(
            headers["content-length"].to_str().unwrap(),
            bytes.len().to_string()
        );
        assert!(
            headers["content-disposition"]
                .to_str()
                .unwrap()
                .contains("photo.png")
        );
        assert_eq!(body, bytes);
    }

    #[tokio::test]
    async fn upload_stamps_server_side_fields() {
        let app = TestApp::spawn().await;
        let user = identity("owner-7", 2);

        let res = app
            .upload(
                vec![("clip.mp4", "video/mp4", payload(64))],
                Some(("post-9", "post")),
                &user,
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);

        let blob = &res.body.as_array().unwrap()[0];
        assert!(uuid::Uuid::parse_str(blob["id"].as_str().unwrap()).is_ok());
        assert_eq!(blob["owner_id"].as_str().unwrap(), "owner-7");
        assert_eq!(blob["type"].as_str().unwrap(), "video");
        assert_eq!(blob["target_id"].as_str().unwrap(), "post-9");
        assert_eq!(blob["target_type"].as_str().unwrap(), "post");
        assert_eq!(blob["file_name"].as_str().unwrap(), "clip.mp4");
        assert!(blob["created_at"].as_str().is_some());
    }

    #[tokio::test]
    async fn rejects_disallowed_content_type_without_trace() {
        let app = TestApp::spawn().await;
        let user = identity("u2", 2);

        let res = app
            .upload_one("notes.txt", "text/plain", payload(16), &user)
            .await;
        assert_eq!(res.status, 500);
        let errors = res.body["errors"].as_array().unwrap();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].as_str().unwrap().contains("notes.txt"));
        assert_eq!(res.body["saved"].as_array().unwrap().len(), 0);

        // No metadata row survives the rejection.
        let list = app.get_with_identity(routes::LIST, &user).await;
        assert_eq!(list.status, 200);
        assert_eq!(list.body["data"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn zero_files_is_bad_request() {
        let app = TestApp::spawn().await;

        let res = app.upload(vec![], None, &identity("u1", 2)).await;
        assert_eq!(res.status, 400);
    }

    #[tokio::test]
    async fn upload_requires_identity() {
        let app = TestApp::spawn().await;

        let form = reqwest::multipart::Form::new().part(
            "files",
            reqwest::multipart::Part::bytes(payload(8))
                .file_name("a.png")
                .mime_str("image/png")
                .unwrap(),
        );
        let res = app
            .client
            .post(format!("http://{}{}", app.addr, routes::UPLOAD))
            .multipart(form)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status().as_u16(), 401);
    }

    #[tokio::test]
    async fn partial_failure_isolates_sibling_files() {
        let app = TestApp::spawn().await;
        let user = identity("u3", 2);

        let res = app
            .upload(
                vec![
                    ("a.png", "image/png", payload(2_000)),
                    ("b.txt", "text/plain", payload(2_000)),
                    ("c.mp4", "video/mp4", payload(2_000)),
                ],
                None,
                &user,
            )
            .await;

        // The request as a whole fails, but the two valid files are durable.
        assert_eq!(res.status, 500);
        let errors = res.body["errors"].as_array().unwrap();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].as_str().unwrap().contains("b.txt"));

        let saved = res.body["saved"].as_array().unwrap();
        assert_eq!(saved.len(), 2);
        for blob in saved {
            let id = blob["id"].as_str().unwrap();
            let lookup = app.get(&routes::blob(id)).await;
            assert_eq!(lookup.status, 200);
            let (status, _, body) = app.download(id).await;
            assert_eq!(status, 200);
            assert_eq!(body.len(), 2_000);
        }
    }
}

mod metadata {
    use super::*;

    #[tokio::test]
    async fn get_returns_blob_metadata() {
        let app = TestApp::spawn().await;
        let user = identity("u1", 2);

        let res = app
            .upload_one("pic.jpg", "image/jpeg", payload(300), &user)
            .await;
        let id = res.body[0]["id"].as_str().unwrap().to_string();

        let lookup = app.get(&routes::blob(&id)).await;
        assert_eq!(lookup.status, 200);
        assert_eq!(lookup.body["file_name"].as_str().unwrap(), "pic.jpg");
        assert_eq!(lookup.body["content_type"].as_str().unwrap(), "image/jpeg");
        assert_eq!(lookup.body["size"].as_i64().unwrap(), 300);
    }

    #[tokio::test]
    async fn unknown_blob_is_not_found() {
        let app = TestApp::spawn().await;

        let res = app.get(&routes::blob(&uuid::Uuid::new_v4().to_string())).await;
        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn download_of_unknown_blob_is_not_found() {
        let app = TestApp::spawn().await;

        let (status, _, _) = app.download(&uuid::Uuid::new_v4().to_string()).await;
        assert_eq!(status, 404);
    }
}

mod deletion {
    use super::*;

    #[tokio::test]
    async fn owner_delete_removes_metadata_and_content() {
        let app = TestApp::spawn().await;
        let user = identity("u1", 2);

        let res = app
            .upload_one("gone.png", "image/png", payload(500), &user)
            .await;
        let id = res.body[0]["id"].as_str().unwrap().to_string();

        let del = app.delete_with_identity(&routes::delete(&id), &user).await;
        assert_eq!(del.status, 200, "{}", del.text);
        assert_eq!(del.body["message"].as_str().unwrap(), "deleted");

        assert_eq!(app.get(&routes::blob(&id)).await.status, 404);
        let (status, _, _) = app.download(&id).await;
        assert_eq!(status, 404);
    }

    #[tokio::test]
    async fn restricted_caller_cannot_delete_another_owners_blob() {
        let app = TestApp::spawn().await;
        let owner = identity("u1", 2);
        let stranger = identity("u2", 2);

        let res = app
            .upload_one("keep.png", "image/png", payload(100), &owner)
            .await;
        let id = res.body[0]["id"].as_str().unwrap().to_string();

        let del = app
            .delete_with_identity(&routes::delete(&id), &stranger)
            .await;
        assert_eq!(del.status, 403);

        // The blob survives the denied attempt.
        assert_eq!(app.get(&routes::blob(&id)).await.status, 200);
        let (status, _, body) = app.download(&id).await;
        assert_eq!(status, 200);
        assert_eq!(body.len(), 100);
    }

    #[tokio::test]
    async fn privileged_caller_can_delete_any_blob() {
        let app = TestApp::spawn().await;
        let owner = identity("u1", 2);
        let admin = identity("root", 0);

        let res = app
            .upload_one("any.png", "image/png", payload(100), &owner)
            .await;
        let id = res.body[0]["id"].as_str().unwrap().to_string();

        let del = app.delete_with_identity(&routes::delete(&id), &admin).await;
        assert_eq!(del.status, 200);
        assert_eq!(app.get(&routes::blob(&id)).await.status, 404);
    }

    #[tokio::test]
    async fn deleting_unknown_blob_is_not_found() {
        let app = TestApp::spawn().await;

        let del = app
            .delete_with_identity(
                &routes::delete(&uuid::Uuid::new_v4().to_string()),
                &identity("u1", 2),
            )
            .await;
        assert_eq!(del.status, 404);
    }
}

mod listing {
    use super::*;

    #[tokio::test]
    async fn pages_are_disjoint_and_newest_first() {
        let app = TestApp::spawn().await;
        let user = identity("u1", 2);

        for i in 0..15 {
            let res = app
                .upload_one(&format!("f{i:02}.png"), "image/png", payload(32), &user)
                .await;
            assert_eq!(res.status, 200, "{}", res.text);
        }

        let page1 = app.get_with_identity(&routes::list_page(1), &user).await;
        let page2 = app.get_with_identity(&routes::list_page(2), &user).await;
        assert_eq!(page1.status, 200);
        assert_eq!(page2.status, 200);

        let first: Vec<&str> = page1.body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|b| b["id"].as_str().unwrap())
            .collect();
        let second: Vec<&str> = page2.body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|b| b["id"].as_str().unwrap())
            .collect();

        assert_eq!(first.len(), 10);
        assert_eq!(second.len(), 5);
        assert!(first.iter().all(|id| !second.contains(id)));

        // Newest first: the last upload leads the first page.
        assert_eq!(
            page1.body["data"][0]["file_name"].as_str().unwrap(),
            "f14.png"
        );
    }

    #[tokio::test]
    async fn listing_is_scoped_to_the_caller() {
        let app = TestApp::spawn().await;
        let alice = identity("alice", 2);
        let bob = identity("bob", 2);

        for name in ["a1.png", "a2.png"] {
            app.upload_one(name, "image/png", payload(16), &alice).await;
        }
        app.upload_one("b1.png", "image/png", payload(16), &bob).await;

        let res = app.get_with_identity(routes::LIST, &alice).await;
        assert_eq!(res.body["data"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn page_zero_is_invalid() {
        let app = TestApp::spawn().await;

        let res = app
            .get_with_identity(&routes::list_page(0), &identity("u1", 2))
            .await;
        assert_eq!(res.status, 400);
    }

    #[tokio::test]
    async fn listing_requires_identity() {
        let app = TestApp::spawn().await;

        let res = app.get(routes::LIST).await;
        assert_eq!(res.status, 401);
    }
}

mod atomicity {
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    use sea_orm::EntityTrait;
    use tokio::io::{AsyncRead, ReadBuf};

    use server::entity::blob;
    use server::error::AppError;
    use server::store::{BlobEngine, BlobTemplate};

    use super::*;

    /// Reader that delivers one buffer and then fails, interrupting the
    /// relay after the content object already exists.
    struct FailingReader {
        sent: bool,
    }

    impl AsyncRead for FailingReader {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            if self.sent {
                return Poll::Ready(Err(io::Error::other("source stream broke")));
            }
            self.sent = true;
            buf.put_slice(&[7u8; 1024]);
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn failed_save_leaves_no_metadata_row() {
        let app = TestApp::spawn().await;
        let engine = BlobEngine::new(app.db.clone(), vec!["image/".to_string()]);
        let template = BlobTemplate {
            owner_id: "u1".to_string(),
            target_id: None,
            target_type: None,
        };

        let err = engine
            .save_blob(
                &template,
                "torn.png",
                "image/png",
                Box::new(FailingReader { sent: false }),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::StreamFailure(_)), "{err}");

        // The rollback discarded the half-written save entirely.
        let rows = blob::Entity::find().all(&app.db).await.unwrap();
        assert!(rows.is_empty());
    }
}
