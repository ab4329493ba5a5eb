pub mod attempt_delivery;
pub mod cleanup_deliveries;
pub mod delete_endpoint;
pub mod delivery_worker;
pub mod dispatch_event;
pub mod get_delivery_attempt;
pub mod get_endpoint;
pub mod list_delivery_attempts;
pub mod list_endpoints;
pub mod register_endpoint;
pub mod requeue_stale_attempts;
pub mod retry_delivery;
pub mod rotate_secret;
pub mod send_test_webhook;
pub mod update_endpoint;
