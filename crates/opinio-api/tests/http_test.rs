//! HTTP client tests against a loopback responder.

use opinio_api::{ApiError, HttpOpinionApi, OpinionApi, StepStatus, WorkflowAction, WorkflowRequest};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Accept one connection, answer it with `status` and `body`, and hand back
/// the raw request text.
async fn serve_once(status: u16, body: &'static str) -> (String, JoinHandle<String>) {
  let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
  let base_url = format!("http://{}", listener.local_addr().unwrap());

  let handle = tokio::spawn(async move {
    let (mut socket, _) = listener.accept().await.unwrap();
    let request = read_request(&mut socket).await;

    let response = format!(
      "HTTP/1.1 {} Test\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
      status,
      body.len(),
      body
    );
    socket.write_all(response.as_bytes()).await.unwrap();
    socket.shutdown().await.unwrap();

    request
  });

  (base_url, handle)
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
  let mut buf = Vec::new();
  let mut chunk = [0u8; 1024];

  loop {
    let n = socket.read(&mut chunk).await.unwrap();
    if n == 0 {
      break;
    }
    buf.extend_from_slice(&chunk[..n]);

    let text = String::from_utf8_lossy(&buf);
    if let Some(header_end) = text.find("\r\n\r\n") {
      let content_length = text[..header_end]
        .lines()
        .find_map(|line| {
          let (name, value) = line.split_once(':')?;
          name
            .eq_ignore_ascii_case("content-length")
            .then(|| value.trim().parse::<usize>().ok())
            .flatten()
        })
        .unwrap_or(0);

      if buf.len() >= header_end + 4 + content_length {
        break;
      }
    }
  }

  String::from_utf8(buf).unwrap()
}

#[tokio::test]
async fn test_submit_opinion_posts_content_to_topic() {
  let (base_url, server) = serve_once(
    200,
    r#"{"content": "测试内容", "topic_id": 7, "transaction_details": {"transaction_hash": "0xabcdef1234567890", "block_number": 12, "status": true, "gas_used": 21000}}"#,
  )
  .await;

  let api = HttpOpinionApi::new(&base_url).unwrap();
  let submission = api.submit_opinion(7, "测试内容").await.unwrap();

  assert_eq!(submission.topic_id, 7);
  assert_eq!(submission.transaction_hash(), Some("0xabcdef1234567890"));

  let request = server.await.unwrap();
  assert!(request.starts_with("POST /topics/7/opinions HTTP/1.1"));
  assert!(request.to_lowercase().contains("content-type: application/json"));
  assert!(request.ends_with(r#"{"content":"测试内容"}"#));
}

#[tokio::test]
async fn test_start_workflow_sends_action() {
  let (base_url, server) = serve_once(200, r#"{"task_id": "abc"}"#).await;

  let api = HttpOpinionApi::new(&base_url).unwrap();
  let started = api
    .start_workflow(&WorkflowRequest {
      topic_id: 1,
      content: "hello".to_string(),
      action: WorkflowAction::Full,
    })
    .await
    .unwrap();

  assert_eq!(started.task_id, "abc");

  let request = server.await.unwrap();
  assert!(request.starts_with("POST /workflow/opinions/ HTTP/1.1"));
  assert!(request.contains(r#""action":"full""#));
}

#[tokio::test]
async fn test_process_status_path_includes_task_id() {
  let (base_url, server) =
    serve_once(200, r#"{"step_id": "ai_fetching", "status": "processing"}"#).await;

  let api = HttpOpinionApi::new(&base_url).unwrap();
  let status = api.process_status("abc").await.unwrap();

  assert_eq!(status.step_id, "ai_fetching");
  assert_eq!(status.status, StepStatus::Processing);

  let request = server.await.unwrap();
  assert!(request.starts_with("GET /workflow/status/abc HTTP/1.1"));
}

#[tokio::test]
async fn test_non_success_surfaces_detail() {
  let (base_url, server) =
    serve_once(400, r#"{"detail": "观点内容不能为空", "status_code": 400}"#).await;

  let api = HttpOpinionApi::new(&base_url).unwrap();
  let err = api.submit_opinion(1, " ").await.unwrap_err();

  assert!(matches!(err, ApiError::Rejected { status: 400, .. }));
  assert_eq!(err.to_string(), "观点内容不能为空");
  server.await.unwrap();
}

#[tokio::test]
async fn test_malformed_success_body_is_decode_error() {
  let (base_url, server) = serve_once(200, r#"{"unexpected": true}"#).await;

  let api = HttpOpinionApi::new(&base_url).unwrap();
  let err = api.contract_status().await.unwrap_err();

  assert!(matches!(err, ApiError::Decode { .. }));
  server.await.unwrap();
}

#[tokio::test]
async fn test_opinions_by_topic() {
  let (base_url, server) = serve_once(
    200,
    r#"[{"id": 1, "content": "a", "topic_id": 2, "timestamp": "2024-01-01T00:00:00Z"}, {"id": 2, "content": "b", "topic_id": 2, "timestamp": "2024-01-02T00:00:00Z", "user": "0x1"}]"#,
  )
  .await;

  let api = HttpOpinionApi::new(&base_url).unwrap();
  let opinions = api.opinions_by_topic(2).await.unwrap();

  assert_eq!(opinions.len(), 2);
  assert_eq!(opinions[1].user.as_deref(), Some("0x1"));

  let request = server.await.unwrap();
  assert!(request.starts_with("GET /topics/2/opinions HTTP/1.1"));
}

#[tokio::test]
async fn test_connection_refused_is_transport_error() {
  // Bind then drop to get a port nothing listens on.
  let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  drop(listener);

  let api = HttpOpinionApi::new(&format!("http://{}", addr)).unwrap();
  let err = api.contract_status().await.unwrap_err();

  assert!(matches!(err, ApiError::Transport(_)));
}
