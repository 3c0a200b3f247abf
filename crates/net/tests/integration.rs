//! Integration tests for net crate

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use kratos_errors::{DownloadError, Error, HashError, NetworkError, StorageError};
    use kratos_events::{
        channel, ProgressSink, SessionEvent, SessionReceiver, SessionSender, SinkEvent,
        SinkReceiver,
    };
    use kratos_hash::{Hash, HashAccumulator, HashAlgorithm};
    use kratos_net::*;
    use kratos_types::DownloadTarget;
    use tempfile::tempdir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::task::JoinHandle;

    fn content() -> Vec<u8> {
        (0..64 * 1024u32).map(|i| (i % 251) as u8).collect()
    }

    /// A 200 response announcing `declared` body bytes and carrying `body`
    fn raw_response(body: &[u8], declared: usize) -> Vec<u8> {
        let mut response = format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {declared}\r\nConnection: close\r\n\r\n"
        )
        .into_bytes();
        response.extend_from_slice(body);
        response
    }

    /// Serve one canned response per connection, in order, then stop.
    /// The handle resolves to the number of connections served.
    async fn serve_raw(responses: Vec<Vec<u8>>) -> (u16, JoinHandle<usize>) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let handle = tokio::spawn(async move {
            let mut served = 0;
            for response in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    let n = socket.read(&mut buf).await.unwrap();
                    if n == 0 {
                        break;
                    }
                    request.extend_from_slice(&buf[..n]);
                }
                socket.write_all(&response).await.unwrap();
                socket.flush().await.unwrap();
                served += 1;
            }
            served
        });

        (port, handle)
    }

    fn drain_sink(rx: &mut SinkReceiver) -> Vec<SinkEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn drain_session(rx: &mut SessionReceiver) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_download_file() {
        let server = MockServer::start_async().await;
        let body = content();
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/assets/blob.bin");
                then.status(200).body(&body);
            })
            .await;

        let temp = tempdir().unwrap();
        let dest = temp.path().join("nested/dir/blob.bin");
        let target = DownloadTarget::new(&server.url("/assets/blob.bin"), &dest).unwrap();
        let client = NetClient::with_defaults().unwrap();

        let mut sink = ProgressSink::new();
        let mut rx = sink.subscribe();
        let mut hasher = HashAccumulator::with_algorithm(HashAlgorithm::Sha1);

        let result = run_download(&client, &target, Some(&sink), Some(&mut hasher))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(result, target);

        let downloaded = tokio::fs::read(&dest).await.unwrap();
        assert_eq!(downloaded, body);
        assert_eq!(sink.bytes_transferred(), body.len() as u64);
        assert_eq!(sink.expected_size(), body.len() as i64);
        assert_eq!(
            hasher.hex_digest(),
            Hash::from_data(HashAlgorithm::Sha1, &body).to_hex()
        );

        let events = drain_sink(&mut rx);
        let streamed: usize = events
            .iter()
            .filter_map(|e| match e {
                SinkEvent::Progress { chunk } => Some(chunk.len()),
                _ => None,
            })
            .sum();
        assert_eq!(streamed, body.len());
        assert!(matches!(events.last(), Some(SinkEvent::Finish { target: t }) if t == &target));
        assert_eq!(events.iter().filter(|e| e.name() == "finish").count(), 1);
        assert!(events.iter().all(|e| e.name() != "error"));
    }

    #[tokio::test]
    async fn test_download_without_sink() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/plain.txt");
                then.status(200).body("plain");
            })
            .await;

        let temp = tempdir().unwrap();
        let dest = temp.path().join("plain.txt");
        let target = DownloadTarget::new(&server.url("/plain.txt"), &dest).unwrap();
        let client = NetClient::with_defaults().unwrap();

        run_download(&client, &target, None, None).await.unwrap();
        assert_eq!(tokio::fs::read_to_string(&dest).await.unwrap(), "plain");
    }

    #[tokio::test]
    async fn test_http_404_emits_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/missing.jar");
                then.status(404).body("nope");
            })
            .await;

        let temp = tempdir().unwrap();
        let dest = temp.path().join("missing.jar");
        let target = DownloadTarget::new(&server.url("/missing.jar"), &dest).unwrap();
        let client = NetClient::with_defaults().unwrap();

        let mut sink = ProgressSink::new();
        let mut rx = sink.subscribe();

        let err = run_download(&client, &target, Some(&sink), None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Network(NetworkError::HttpStatus { status: 404, .. })
        ));

        let events = drain_sink(&mut rx);
        assert_eq!(events.len(), 1);
        match &events[0] {
            SinkEvent::Error { error } => {
                assert!(error
                    .to_string()
                    .contains("Unable to do HTTP Get with status 404"));
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(sink.bytes_transferred(), 0);

        // The destination was opened before the request
        let metadata = tokio::fs::metadata(&dest).await.unwrap();
        assert_eq!(metadata.len(), 0);
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let temp = tempdir().unwrap();
        let target = DownloadTarget::new(
            &format!("http://127.0.0.1:{port}/gone.bin"),
            temp.path().join("gone.bin"),
        )
        .unwrap();
        let client = NetClient::with_defaults().unwrap();

        let mut sink = ProgressSink::new();
        let mut rx = sink.subscribe();

        let err = run_download(&client, &target, Some(&sink), None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Network(NetworkError::ConnectionRefused(_))
        ));

        let events = drain_sink(&mut rx);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name(), "error");
    }

    #[tokio::test]
    async fn test_stream_reset_emits_single_error() {
        let (port, server) = serve_raw(vec![raw_response(&[7u8; 10], 100)]).await;

        let temp = tempdir().unwrap();
        let target = DownloadTarget::new(
            &format!("http://127.0.0.1:{port}/cut.bin"),
            temp.path().join("cut.bin"),
        )
        .unwrap();
        let client = NetClient::with_defaults().unwrap();

        let mut sink = ProgressSink::new();
        let mut rx = sink.subscribe();

        let err = run_download(&client, &target, Some(&sink), None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Network(NetworkError::DownloadFailed(_))
        ));
        assert_eq!(server.await.unwrap(), 1);
        assert_eq!(sink.expected_size(), 100);
        assert!(sink.bytes_transferred() <= 10);

        // Partial chunks may arrive before the connection drops
        let events = drain_sink(&mut rx);
        assert_eq!(events.iter().filter(|e| e.name() == "error").count(), 1);
        assert!(events.iter().all(|e| e.name() != "finish"));
        assert_eq!(events.last().map(SinkEvent::name), Some("error"));
    }

    #[tokio::test]
    async fn test_write_failure_skips_request() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/file.bin");
                then.status(200).body("data");
            })
            .await;

        let temp = tempdir().unwrap();
        let blocker = temp.path().join("blocker");
        tokio::fs::write(&blocker, b"not a directory").await.unwrap();

        let target =
            DownloadTarget::new(&server.url("/file.bin"), blocker.join("file.bin")).unwrap();
        let client = NetClient::with_defaults().unwrap();

        let mut sink = ProgressSink::new();
        let mut rx = sink.subscribe();

        let err = run_download(&client, &target, Some(&sink), None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Storage(StorageError::DirectoryCreateFailed { .. })
        ));

        let events = drain_sink(&mut rx);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name(), "error");
        assert_eq!(mock.hits_async().await, 0);
    }

    #[tokio::test]
    async fn test_repeated_download_overwrites() {
        let server = MockServer::start_async().await;
        let body = content();
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/stable.bin");
                then.status(200).body(&body);
            })
            .await;

        let temp = tempdir().unwrap();
        let dest = temp.path().join("stable.bin");
        tokio::fs::write(&dest, vec![0u8; body.len() * 2]).await.unwrap();

        let target = DownloadTarget::new(&server.url("/stable.bin"), &dest).unwrap();
        let client = NetClient::with_defaults().unwrap();
        let sink = ProgressSink::new();

        for _ in 0..3 {
            run_download(&client, &target, Some(&sink), None).await.unwrap();
            assert_eq!(tokio::fs::read(&dest).await.unwrap(), body);
        }

        mock.assert_hits_async(3).await;
        assert_eq!(sink.bytes_transferred(), 3 * body.len() as u64);
    }

    #[tokio::test]
    async fn test_request_headers() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/private.bin")
                    .header("x-launcher", "kratos");
                then.status(200).body("secret");
            })
            .await;

        let temp = tempdir().unwrap();
        let target =
            DownloadTarget::new(&server.url("/private.bin"), temp.path().join("p.bin")).unwrap();
        let client = NetClient::with_defaults().unwrap();

        DownloadAttempt::new(&target)
            .with_header("X-Launcher", "kratos")
            .unwrap()
            .run(&client)
            .await
            .unwrap();

        let options = VerifyOptions::new().with_header("x-launcher", "kratos").unwrap();
        let expected = Hash::from_data(HashAlgorithm::Sha1, b"secret").to_hex();
        run_verified_download(&client, target, &expected, options)
            .await
            .unwrap();

        mock.assert_hits_async(2).await;
    }

    #[tokio::test]
    async fn test_verified_download_success() {
        let server = MockServer::start_async().await;
        let body = content();
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/lib.jar");
                then.status(200).body(&body);
            })
            .await;

        let temp = tempdir().unwrap();
        let target = DownloadTarget::new(&server.url("/lib.jar"), temp.path().join("lib.jar")).unwrap();
        let client = NetClient::with_defaults().unwrap();

        let (tx, mut rx): (SessionSender, SessionReceiver) = channel();
        let expected = Hash::from_data(HashAlgorithm::Sha1, &body).to_hex();

        let result = run_verified_download(
            &client,
            target.clone(),
            &expected,
            VerifyOptions::new().with_observer(tx),
        )
        .await
        .unwrap();
        assert_eq!(result, target);
        mock.assert_hits_async(1).await;

        let events = drain_session(&mut rx);
        assert_eq!(events.len(), 1);
        match &events[0] {
            SessionEvent::Success { target: t, session } => {
                assert_eq!(t, &target);
                assert_eq!(session.attempt, 0);
                assert_eq!(session.expected_hash, expected);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_verified_download_with_sha256() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/index.json");
                then.status(200).body("{\"objects\":{}}");
            })
            .await;

        let temp = tempdir().unwrap();
        let target =
            DownloadTarget::new(&server.url("/index.json"), temp.path().join("index.json")).unwrap();
        let client = NetClient::with_defaults().unwrap();
        let expected = Hash::from_data(HashAlgorithm::Sha256, b"{\"objects\":{}}").to_hex();

        let options = VerifyOptions::new().with_algorithm("SHA-256");
        run_verified_download(&client, target, &expected, options)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_mismatch_then_match_succeeds_on_retry() {
        let (port, server) = serve_raw(vec![
            raw_response(b"bad!", 4),
            raw_response(b"good", 4),
        ])
        .await;

        let temp = tempdir().unwrap();
        let dest = temp.path().join("flaky.jar");
        let target =
            DownloadTarget::new(&format!("http://127.0.0.1:{port}/flaky.jar"), &dest).unwrap();
        let client = NetClient::with_defaults().unwrap();

        let mut sink = ProgressSink::new();
        let mut sink_rx = sink.subscribe();
        let (tx, mut rx): (SessionSender, SessionReceiver) = channel();
        let expected = Hash::from_data(HashAlgorithm::Sha1, b"good").to_hex();

        let options = VerifyOptions::new()
            .with_max_attempts(3)
            .with_sink(&sink)
            .with_observer(tx);
        let result = run_verified_download(&client, target.clone(), &expected, options)
            .await
            .unwrap();
        assert_eq!(result, target);
        assert_eq!(server.await.unwrap(), 2);

        let events = drain_session(&mut rx);
        let names: Vec<_> = events.iter().map(SessionEvent::name).collect();
        assert_eq!(names, ["retry", "success"]);
        match &events[0] {
            SessionEvent::Retry { attempt, .. } => assert_eq!(*attempt, 0),
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(events[1].session().attempt, 1);

        let finishes = drain_sink(&mut sink_rx)
            .iter()
            .filter(|e| e.name() == "finish")
            .count();
        assert_eq!(finishes, 2);
        assert_eq!(sink.bytes_transferred(), 8);
        assert_eq!(tokio::fs::read(&dest).await.unwrap(), b"good");
    }

    #[tokio::test]
    async fn test_empty_hash_is_corrupted() {
        let server = MockServer::start_async().await;
        let body = content();
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/corrupt.jar");
                then.status(200).body(&body);
            })
            .await;

        let temp = tempdir().unwrap();
        let dest = temp.path().join("corrupt.jar");
        let target = DownloadTarget::new(&server.url("/corrupt.jar"), &dest).unwrap();
        let client = NetClient::with_defaults().unwrap();

        let mut sink = ProgressSink::new();
        let mut sink_rx = sink.subscribe();
        let (tx, mut rx): (SessionSender, SessionReceiver) = channel();

        let options = VerifyOptions::new()
            .with_max_attempts(4)
            .with_sink(&sink)
            .with_observer(tx);
        let err = run_verified_download(&client, target.clone(), "", options)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("Maximum attempt"));
        assert!(err.is_corrupted());
        assert!(matches!(
            err,
            Error::Download(DownloadError::Corrupted {
                attempts: 4,
                max_attempts: 4,
                ..
            })
        ));
        mock.assert_hits_async(4).await;

        let events = drain_session(&mut rx);
        assert_eq!(events.len(), 5);
        for (i, event) in events[..4].iter().enumerate() {
            match event {
                SessionEvent::Retry { attempt, .. } => assert_eq!(*attempt as usize, i),
                other => panic!("unexpected event {other:?}"),
            }
        }
        assert_eq!(events[4].name(), "corrupted");
        assert_eq!(events[4].session().attempt, 4);

        // One shared sink sees every attempt
        assert_eq!(sink.bytes_transferred(), 4 * body.len() as u64);
        let finishes = drain_sink(&mut sink_rx)
            .iter()
            .filter(|e| e.name() == "finish")
            .count();
        assert_eq!(finishes, 4);

        // The last attempt's bytes stay on disk
        assert_eq!(tokio::fs::read(&dest).await.unwrap(), body);
    }

    #[tokio::test]
    async fn test_budget_of_ten_makes_ten_attempts() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/ten.bin");
                then.status(200).body("always the same");
            })
            .await;

        let temp = tempdir().unwrap();
        let target =
            DownloadTarget::new(&server.url("/ten.bin"), temp.path().join("ten.bin")).unwrap();
        let client = NetClient::with_defaults().unwrap();
        let wrong = Hash::from_data(HashAlgorithm::Sha1, b"something else").to_hex();

        let err = run_verified_download(
            &client,
            target,
            &wrong,
            VerifyOptions::new().with_max_attempts(10),
        )
        .await
        .unwrap_err();

        assert!(err.to_string().contains("Maximum attempt reached (10/10)"));
        mock.assert_hits_async(10).await;
    }

    #[tokio::test]
    async fn test_http_error_aborts_session() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/flaky.bin");
                then.status(503);
            })
            .await;

        let temp = tempdir().unwrap();
        let target =
            DownloadTarget::new(&server.url("/flaky.bin"), temp.path().join("flaky.bin")).unwrap();
        let client = NetClient::with_defaults().unwrap();
        let (tx, mut rx): (SessionSender, SessionReceiver) = channel();

        let err = run_verified_download(
            &client,
            target,
            "",
            VerifyOptions::new().with_observer(tx),
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            Error::Network(NetworkError::HttpStatus { status: 503, .. })
        ));
        mock.assert_hits_async(1).await;
        assert!(drain_session(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_unsupported_algorithm_fails_before_request() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/never.bin");
                then.status(200).body("x");
            })
            .await;

        let temp = tempdir().unwrap();
        let target =
            DownloadTarget::new(&server.url("/never.bin"), temp.path().join("never.bin")).unwrap();
        let client = NetClient::with_defaults().unwrap();

        let options = VerifyOptions::new().with_algorithm("whirlpool");
        let err = run_verified_download(&client, target, "", options)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Hash(HashError::UnsupportedAlgorithm { .. })
        ));
        assert_eq!(mock.hits_async().await, 0);
    }

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_blocklist_jar_sha1() {
        let temp = tempdir().unwrap();
        let target = DownloadTarget::new(
            "https://libraries.minecraft.net/com/mojang/blocklist/1.0.10/blocklist-1.0.10.jar",
            temp.path().join("blocklist-1.0.10.jar"),
        )
        .unwrap();
        let client = NetClient::with_defaults().unwrap();
        let mut hasher = HashAccumulator::new("sha1").unwrap();

        run_download(&client, &target, None, Some(&mut hasher))
            .await
            .unwrap();
        assert_eq!(
            hasher.hex_digest(),
            "5c685c5ffa94c4cd39496c7184c1d122e515ecef"
        );

        run_verified_download(
            &client,
            target,
            "5c685c5ffa94c4cd39496c7184c1d122e515ecef",
            VerifyOptions::new(),
        )
        .await
        .unwrap();
    }
}
