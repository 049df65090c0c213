//! HTTP 服务客户端
//!
//! 每次请求通过负载均衡器选择一个下游端点

use crate::discovery::LoadBalancer;
use crate::error::{BeaconError, Result};
use http::Method;
use http::header::{CONTENT_TYPE, HeaderName, HeaderValue};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// 默认请求超时
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// 默认重试次数（不重试）
pub const DEFAULT_RETRIES: u32 = 0;

/// 每个请求都会带上的 Content-Type
pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// 发送前对请求的钩子
pub type RequestHook = Arc<dyn Fn(&mut reqwest::Request) + Send + Sync>;

/// 收到响应后的钩子
pub type ResponseHook = Arc<dyn Fn(&reqwest::Response) + Send + Sync>;

/// 默认 HTTP 客户端：5 秒超时，不复用连接
pub fn default_http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(DEFAULT_TIMEOUT)
        .pool_max_idle_per_host(0)
        .build()
        .map_err(BeaconError::from)
}

/// 请求构建器
#[derive(Clone)]
pub struct RequestBuilder {
    pub id: String,
    pub path: String,
    pub method: Method,
    pub payload: Option<Vec<u8>>,
    headers: HashMap<String, String>,
    query: HashMap<String, String>,
    request_hooks: Vec<RequestHook>,
    response_hooks: Vec<ResponseHook>,
}

impl RequestBuilder {
    pub fn new(id: impl Into<String>, method: Method, path: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
            method,
            payload: None,
            headers: HashMap::new(),
            query: HashMap::new(),
            request_hooks: Vec::new(),
            response_hooks: Vec::new(),
        }
    }

    pub fn payload(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    /// 序列化为 JSON 作为请求体
    pub fn json_payload<T: serde::Serialize>(mut self, value: &T) -> Result<Self> {
        let body = serde_json::to_vec(value)
            .map_err(|e| BeaconError::request(format!("failed to encode payload: {}", e)))?;
        self.payload = Some(body);
        Ok(self)
    }

    /// 添加请求头；同名请求头已存在时保留原值
    pub fn add_header(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let value = value.into();
        let slot = self.headers.entry(key.into()).or_default();
        if slot.is_empty() {
            *slot = value;
        }
    }

    /// 设置查询参数；传入 `None` 时不做修改
    pub fn set_query(&mut self, query: Option<HashMap<String, String>>) {
        if let Some(query) = query {
            self.query = query;
        }
    }

    pub fn add_request_hook(&mut self, hook: impl Fn(&mut reqwest::Request) + Send + Sync + 'static) {
        self.request_hooks.push(Arc::new(hook));
    }

    pub fn add_response_hook(&mut self, hook: impl Fn(&reqwest::Response) + Send + Sync + 'static) {
        self.response_hooks.push(Arc::new(hook));
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    pub fn query(&self) -> &HashMap<String, String> {
        &self.query
    }
}

impl fmt::Debug for RequestBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestBuilder")
            .field("id", &self.id)
            .field("method", &self.method)
            .field("path", &self.path)
            .field("headers", &self.headers)
            .field("query", &self.query)
            .field("request_hooks", &self.request_hooks.len())
            .field("response_hooks", &self.response_hooks.len())
            .finish()
    }
}

/// HTTP 服务客户端
pub struct ServiceClient {
    service_name: String,
    load_balancer: Arc<dyn LoadBalancer>,
    http_client: reqwest::Client,
}

impl ServiceClient {
    pub fn new(service_name: impl Into<String>, load_balancer: Arc<dyn LoadBalancer>) -> Result<Self> {
        Ok(Self::with_http_client(
            service_name,
            load_balancer,
            default_http_client()?,
        ))
    }

    pub fn with_http_client(
        service_name: impl Into<String>,
        load_balancer: Arc<dyn LoadBalancer>,
        http_client: reqwest::Client,
    ) -> Self {
        Self {
            service_name: service_name.into(),
            load_balancer,
            http_client,
        }
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn load_balancer(&self) -> &Arc<dyn LoadBalancer> {
        &self.load_balancer
    }

    /// 选择端点并发送请求
    ///
    /// 没有可用端点时返回 `NoEndpointsAvailable`；传输错误转换为 `Request`。
    pub async fn execute(&self, builder: &RequestBuilder) -> Result<reqwest::Response> {
        let endpoint = self.load_balancer.get().await?;
        let mut url = endpoint.url(&builder.path)?;
        if !builder.query.is_empty() {
            url.query_pairs_mut().extend_pairs(builder.query.iter());
        }

        let mut request = reqwest::Request::new(builder.method.clone(), url);
        {
            let headers = request.headers_mut();
            for (key, value) in &builder.headers {
                let name = HeaderName::from_bytes(key.as_bytes())
                    .map_err(|e| BeaconError::request(format!("invalid header {}: {}", key, e)))?;
                let value = HeaderValue::from_str(value)
                    .map_err(|e| BeaconError::request(format!("invalid header {}: {}", key, e)))?;
                headers.insert(name, value);
            }
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(DEFAULT_CONTENT_TYPE));
        }
        if let Some(payload) = &builder.payload {
            *request.body_mut() = Some(payload.clone().into());
        }

        for hook in &builder.request_hooks {
            hook(&mut request);
        }

        debug!(
            service = %self.service_name,
            request_id = %builder.id,
            method = %builder.method,
            url = %request.url(),
            "executing request"
        );
        let response = self.http_client.execute(request).await?;

        for hook in &builder.response_hooks {
            hook(&response);
        }

        Ok(response)
    }

    /// 停止底层负载均衡器
    pub fn stop(&self) {
        self.load_balancer.stop();
    }
}
