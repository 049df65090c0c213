//! 服务发现模块
//!
//! 数据流：注册中心 → 发布者（轮询 + 广播）→ 端点缓存（每个消费者一个）→ 负载均衡器 → 调用方

pub mod cache;
pub mod endpoint;
pub mod load_balancer;
pub mod polling;
pub mod publisher;
pub mod round_robin;
pub mod static_publisher;

pub use cache::EndpointCache;
pub use endpoint::{Endpoint, EndpointSet, empty_set};
pub use load_balancer::LoadBalancer;
pub use polling::{PollingPublisher, RefreshFailurePolicy, format_entries};
pub use publisher::{Publisher, Subscriber, SubscriptionId};
pub use round_robin::{RoundRobin, round_robin};
pub use static_publisher::StaticPublisher;
