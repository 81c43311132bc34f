//! Integration tests for the colloquy library.
//!
//! Most tests drive the chat loop through a scripted in-process backend or a one-shot local
//! HTTP server.  The live test at the end requires an API key in the environment.

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use futures::{StreamExt, stream};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use colloquy::chat::{
        ChatConfig, ChatRepl, Interrupt, Renderer, Responder, ResponseMode, ScriptedInput, Style,
    };
    use colloquy::{
        ChatCompletion, ChatCompletionChunk, ChatCompletionParams, Completions, Error,
        EventStream, FinishReason, Message, Model, OpenAi, Result, Role, StreamEvent,
    };

    /// One scripted reply from the fake service.
    enum Reply {
        Fragments(Vec<&'static str>),
        FailAfter(Vec<&'static str>),
        Refuse,
    }

    /// A completion service that replays scripted replies and records every request.
    #[derive(Clone, Default)]
    struct Scripted {
        replies: Arc<Mutex<VecDeque<Reply>>>,
        requests: Arc<Mutex<Vec<ChatCompletionParams>>>,
    }

    impl Scripted {
        fn new(replies: impl IntoIterator<Item = Reply>) -> Self {
            Self {
                replies: Arc::new(Mutex::new(replies.into_iter().collect())),
                requests: Arc::default(),
            }
        }

        fn requests(&self) -> Vec<ChatCompletionParams> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl Completions for Scripted {
        async fn send(&self, _: ChatCompletionParams) -> Result<ChatCompletion> {
            Err(Error::bad_request("blocking mode is not scripted", None))
        }

        async fn stream(&self, params: ChatCompletionParams) -> Result<EventStream> {
            self.requests.lock().unwrap().push(params);
            let reply = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Reply::Fragments(Vec::new()));
            let mut events = vec![Ok(StreamEvent::Chunk(ChatCompletionChunk::role(
                Role::Assistant,
            )))];
            match reply {
                Reply::Fragments(fragments) => {
                    events.extend(
                        fragments
                            .into_iter()
                            .map(|f| Ok(StreamEvent::Chunk(ChatCompletionChunk::text(f)))),
                    );
                    events.push(Ok(StreamEvent::Chunk(ChatCompletionChunk::finished(
                        FinishReason::Stop,
                    ))));
                    events.push(Ok(StreamEvent::Done));
                }
                Reply::FailAfter(fragments) => {
                    events.extend(
                        fragments
                            .into_iter()
                            .map(|f| Ok(StreamEvent::Chunk(ChatCompletionChunk::text(f)))),
                    );
                    events.push(Err(Error::streaming("connection reset by peer", None)));
                }
                Reply::Refuse => return Err(Error::authentication("invalid api key")),
            }
            Ok(Box::pin(stream::iter(events)))
        }
    }

    #[derive(Default)]
    struct Transcript {
        out: String,
        errors: Vec<String>,
    }

    impl Renderer for Transcript {
        fn write(&mut self, text: &str, _: Style) {
            self.out.push_str(text);
        }

        fn newline(&mut self) {
            self.out.push('\n');
        }

        fn reset_style(&mut self) {}

        fn print_error(&mut self, error: &str) {
            self.errors.push(error.to_string());
        }

        fn print_warning(&mut self, _: &str) {}
    }

    fn streaming(backend: Scripted) -> Responder<Scripted> {
        Responder::new(backend, Model::capable(), ResponseMode::Streaming)
    }

    #[tokio::test]
    async fn hello_streams_three_fragments() {
        let backend = Scripted::new([Reply::Fragments(vec!["Hi", " there", "!"])]);
        let mut responder = streaming(backend.clone());

        let mut exchange = responder.ask("hello").await.unwrap();
        let mut fragments = Vec::new();
        while let Some(fragment) = exchange.next().await {
            fragments.push(fragment.unwrap());
        }
        drop(exchange);

        assert_eq!(fragments, vec!["Hi", " there", "!"]);
        assert_eq!(
            responder.session().snapshot(),
            &[Message::user("hello"), Message::assistant("Hi there!")]
        );
        assert_eq!(backend.requests()[0].messages, vec![Message::user("hello")]);
    }

    #[tokio::test]
    async fn reply_is_concatenation_of_fragments() {
        let fragments = vec!["fn", " main", "()", " {", "\n", "    ", "}", " é", "🙂"];
        let backend = Scripted::new([Reply::Fragments(fragments.clone())]);
        let mut responder = streaming(backend);
        let text = responder
            .ask("write code")
            .await
            .unwrap()
            .collect_text()
            .await
            .unwrap();
        assert_eq!(text, fragments.concat());
        let (_, assistant) = responder.session().last_exchange().unwrap();
        assert_eq!(assistant.content, fragments.concat());
    }

    #[tokio::test]
    async fn reset_clears_history_from_next_request() {
        let backend = Scripted::new([
            Reply::Fragments(vec!["first"]),
            Reply::Fragments(vec!["second"]),
        ]);
        let mut responder = streaming(backend.clone());
        tokio_test::assert_ok!(responder.ask("one").await.unwrap().collect_text().await);
        responder.reset();
        assert!(responder.session().is_empty());
        tokio_test::assert_ok!(responder.ask("two").await.unwrap().collect_text().await);

        let requests = backend.requests();
        assert_eq!(requests[1].messages, vec![Message::user("two")]);
    }

    #[tokio::test]
    async fn failed_exchange_leaves_session_unchanged() {
        let backend = Scripted::new([
            Reply::Fragments(vec!["ok"]),
            Reply::FailAfter(vec!["par", "tial"]),
            Reply::Refuse,
        ]);
        let mut responder = streaming(backend);
        responder
            .ask("one")
            .await
            .unwrap()
            .collect_text()
            .await
            .unwrap();
        let before = responder.session().snapshot().to_vec();

        let err = responder
            .ask("two")
            .await
            .unwrap()
            .collect_text()
            .await
            .unwrap_err();
        assert!(err.is_transport());
        assert_eq!(responder.session().snapshot(), before.as_slice());

        let err = responder.ask("three").await.map(|_| ()).unwrap_err();
        assert!(err.is_authentication());
        assert_eq!(responder.session().snapshot(), before.as_slice());
    }

    #[tokio::test]
    async fn loop_recovers_from_transport_failure() {
        let backend = Scripted::new([
            Reply::FailAfter(vec!["par"]),
            Reply::Fragments(vec!["fine"]),
        ]);
        let responder = streaming(backend.clone());
        let input = ScriptedInput::new(["", "first", "second", "exit"]);
        let mut repl = ChatRepl::new(responder, input, Transcript::default(), ChatConfig::new());
        repl.run(&Interrupt::new()).await.unwrap();

        let requests = backend.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].messages, vec![Message::user("second")]);
        assert_eq!(repl.renderer().errors.len(), 1);
        assert!(repl.renderer().errors[0].contains("connection reset"));
        assert_eq!(repl.renderer().out, "parfine\n\n");
        assert_eq!(repl.responder().session().len(), 2);
    }

    #[tokio::test]
    async fn reserved_tokens_never_reach_the_service() {
        let backend = Scripted::default();
        let responder = streaming(backend.clone());
        let input = ScriptedInput::new(["reset", "reset()", "", "  ", "exit()"]);
        let mut repl = ChatRepl::new(responder, input, Transcript::default(), ChatConfig::new());
        repl.run(&Interrupt::new()).await.unwrap();
        assert!(backend.requests().is_empty());
        assert!(repl.renderer().out.is_empty());
    }

    /// Serve one canned HTTP response and hand back the raw request.
    async fn serve_once(
        status: &'static str,
        content_type: &'static str,
        body: String,
    ) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                if let Some(end) = request.windows(4).position(|w| w == b"\r\n\r\n") {
                    let head = String::from_utf8_lossy(&request[..end]).to_lowercase();
                    let length = head
                        .lines()
                        .find_map(|l| l.strip_prefix("content-length:"))
                        .and_then(|v| v.trim().parse::<usize>().ok())
                        .unwrap_or(0);
                    if request.len() >= end + 4 + length {
                        break;
                    }
                }
            }
            let response = format!(
                "HTTP/1.1 {status}\r\n\
                 Content-Type: {content_type}\r\n\
                 Content-Length: {}\r\n\
                 Connection: close\r\n\
                 \r\n\
                 {body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8(request).unwrap()
        });
        (format!("http://{addr}/v1"), handle)
    }

    #[tokio::test]
    async fn openai_client_streams_over_http() {
        let body = [
            r#"data: {"id":"c1","object":"chat.completion.chunk","choices":[{"index":0,"delta":{"role":"assistant","content":""},"finish_reason":null}]}"#,
            r#"data: {"id":"c1","object":"chat.completion.chunk","choices":[{"index":0,"delta":{"content":"Hi"},"finish_reason":null}]}"#,
            r#"data: {"id":"c1","object":"chat.completion.chunk","choices":[{"index":0,"delta":{"content":" there!"},"finish_reason":null}]}"#,
            r#"data: {"id":"c1","object":"chat.completion.chunk","choices":[{"index":0,"delta":{},"finish_reason":"stop"}]}"#,
            "data: [DONE]",
        ]
        .iter()
        .map(|line| format!("{line}\n\n"))
        .collect::<String>();
        let (base_url, server) = serve_once("200 OK", "text/event-stream", body).await;

        let client = OpenAi::with_base_url("sk-test", &base_url).unwrap();
        let mut responder = Responder::new(client, Model::cheap(), ResponseMode::Streaming);
        let text = responder
            .ask("hello")
            .await
            .unwrap()
            .collect_text()
            .await
            .unwrap();
        assert_eq!(text, "Hi there!");

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /v1/chat/completions HTTP/1.1"));
        assert!(request.to_lowercase().contains("authorization: bearer sk-test"));
        let body = &request[request.find("\r\n\r\n").unwrap() + 4..];
        let body: serde_json::Value = serde_json::from_str(body).unwrap();
        assert_eq!(body["model"], "gpt-3.5-turbo");
        assert_eq!(body["stream"], true);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "hello");
    }

    #[tokio::test]
    async fn openai_client_blocking_reply() {
        let body = r#"{"id":"c2","object":"chat.completion","model":"gpt-4o","choices":[{"index":0,"message":{"role":"assistant","content":"All done."},"finish_reason":"stop"}],"usage":{"prompt_tokens":5,"completion_tokens":3,"total_tokens":8}}"#;
        let (base_url, server) =
            serve_once("200 OK", "application/json", body.to_string()).await;

        let client = OpenAi::with_base_url("sk-test", &base_url).unwrap();
        let mut responder = Responder::new(client, Model::capable(), ResponseMode::Blocking);
        let text = responder
            .ask("finish")
            .await
            .unwrap()
            .collect_text()
            .await
            .unwrap();
        assert_eq!(text, "All done.");
        assert_eq!(responder.session().len(), 2);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn openai_client_maps_error_status() {
        let body = r#"{"error":{"type":"invalid_request_error","message":"Incorrect API key provided"}}"#;
        let (base_url, server) = serve_once(
            "401 Unauthorized",
            "application/json",
            body.to_string(),
        )
        .await;

        let client = OpenAi::with_base_url("sk-wrong", &base_url).unwrap();
        let mut responder = Responder::new(client, Model::capable(), ResponseMode::Streaming);
        let err = responder.ask("hello").await.map(|_| ()).unwrap_err();
        assert!(err.is_authentication());
        assert!(err.is_transport());
        assert!(err.to_string().contains("Incorrect API key"));
        assert!(responder.session().is_empty());
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_live_streaming_exchange() {
        // This test requires OPENAI_API_KEY to be set
        let api_key = std::env::var("OPENAI_API_KEY").ok();
        let Some(api_key) = api_key else {
            eprintln!("Skipping test: OPENAI_API_KEY not set");
            return;
        };

        let client = OpenAi::new(api_key).expect("Failed to create client");
        let mut responder = Responder::new(client, Model::cheap(), ResponseMode::Streaming);
        let text = responder
            .ask("Reply with the single word: pong")
            .await
            .expect("request should succeed with a valid API key")
            .collect_text()
            .await
            .expect("stream should complete");
        assert!(!text.is_empty());
        assert_eq!(responder.session().len(), 2);
    }
}
