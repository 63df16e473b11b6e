//! End-to-end tests of the failover client against in-process RESP mocks.

use std::time::Duration;

use xredis::config::parse_config;
use xredis::pool::ConnPool;
use xredis::{CommandExecutor, Commands, Error, FailoverClient};

mod common;

use common::{
    bulk, error, start_mock_redis, start_scripted_redis, test_options, unused_addr, wait_until,
    Action, NIL, OK, PONG,
};

/// Key of a single-key command such as GET.
fn key(args: &[String]) -> &str {
    args.get(1).map(String::as_str).unwrap_or_default()
}

fn ping_or(args: &[String], otherwise: impl FnOnce(&str) -> Action) -> Action {
    if args[0].eq_ignore_ascii_case("PING") {
        Action::Reply(PONG.to_string())
    } else {
        otherwise(key(args))
    }
}

#[tokio::test]
async fn test_ping_through_pool() {
    let mock = start_mock_redis(|_| OK.to_string()).await;
    let client = FailoverClient::new(&test_options(&[mock.addr])).unwrap();

    assert_eq!(client.ping().await.unwrap(), "PONG");
    client.close().unwrap();
}

#[tokio::test]
async fn test_round_robin_over_instances() {
    let a = start_mock_redis(|_| bulk("a")).await;
    let b = start_mock_redis(|_| bulk("b")).await;
    let c = start_mock_redis(|_| bulk("c")).await;
    let client = FailoverClient::new(&test_options(&[a.addr, b.addr, c.addr])).unwrap();

    let mut seen = Vec::new();
    for _ in 0..6 {
        let value: Option<String> = client.get("key").await.unwrap();
        seen.push(value.unwrap());
    }

    assert_eq!(seen, ["a", "b", "c", "a", "b", "c"]);
    assert_eq!(a.count("GET"), 2);
    assert_eq!(b.count("GET"), 2);
    assert_eq!(c.count("GET"), 2);
    client.close().unwrap();
}

#[tokio::test]
async fn test_missing_key_is_not_retried() {
    let a = start_mock_redis(|_| NIL.to_string()).await;
    let b = start_mock_redis(|_| NIL.to_string()).await;
    let client = FailoverClient::new(&test_options(&[a.addr, b.addr])).unwrap();

    let value: Option<String> = client.get("missing").await.unwrap();
    assert!(value.is_none());
    assert_eq!(a.count("GET") + b.count("GET"), 1);

    let err = client.process(redis::cmd("GET").arg("missing")).await.unwrap_err();
    assert!(err.is_nil());
    client.close().unwrap();
}

#[tokio::test]
async fn test_set_nx_reports_existing_key() {
    let mock = start_mock_redis(|args| {
        if args.iter().any(|arg| arg == "NX") {
            NIL.to_string()
        } else {
            OK.to_string()
        }
    })
    .await;
    let client = FailoverClient::new(&test_options(&[mock.addr])).unwrap();

    client.set("key", "value").await.unwrap();
    assert!(!client.set_nx("key", "other").await.unwrap());
    client.close().unwrap();
}

#[tokio::test]
async fn test_failover_from_erroring_instance() {
    let bad = start_mock_redis(|_| error("instance is sick")).await;
    let good = start_mock_redis(|_| bulk("ok")).await;
    let mut options = test_options(&[bad.addr, good.addr]);
    options.failover.max_retries = 0;
    let client = FailoverClient::new(&options).unwrap();

    for _ in 0..4 {
        let value: Option<String> = client.get("key").await.unwrap();
        assert_eq!(value.as_deref(), Some("ok"));
    }
    assert!(bad.count("GET") >= 1);
    assert_eq!(good.count("GET"), 4);
    client.close().unwrap();
}

#[tokio::test]
async fn test_last_error_returned_when_every_instance_fails() {
    let a = start_mock_redis(|_| error("from a")).await;
    let b = start_mock_redis(|_| error("from b")).await;
    let mut options = test_options(&[a.addr, b.addr]);
    options.failover.max_retries = 1;
    let client = FailoverClient::new(&options).unwrap();

    let result: xredis::Result<Option<String>> = client.get("key").await;
    match result.unwrap_err() {
        Error::Redis(e) => assert!(e.to_string().contains("from a"), "{e}"),
        other => panic!("unexpected error: {other:?}"),
    }
    // Three visits (a, b, a) with two attempts each; a is visited last.
    assert_eq!(a.count("GET"), 4);
    assert_eq!(b.count("GET"), 2);
    client.close().unwrap();
}

#[tokio::test]
async fn test_health_check_evicts_dead_instance() {
    let live = start_mock_redis(|_| bulk("live")).await;
    let dead = unused_addr().await;
    let client = FailoverClient::new(&test_options(&[dead, live.addr])).unwrap();

    let dead_instance = client.balancer().instances()[0].clone();
    assert!(
        wait_until(Duration::from_secs(3), || !dead_instance.is_up()).await,
        "dead instance never marked down"
    );

    let mut options = test_options(&[dead, live.addr]);
    options.failover.failover_retries = Some(0);
    let strict = FailoverClient::with_balancer(client.balancer().clone(), &options.failover);
    for _ in 0..4 {
        let value: Option<String> = strict.get("key").await.unwrap();
        assert_eq!(value.as_deref(), Some("live"));
    }
    assert_eq!(live.count("GET"), 4);
    client.close().unwrap();
}

#[tokio::test]
async fn test_closed_client_rejects_commands() {
    let mock = start_mock_redis(|_| OK.to_string()).await;
    let client = FailoverClient::new(&test_options(&[mock.addr])).unwrap();
    client.set("key", "value").await.unwrap();

    client.close().unwrap();
    assert!(matches!(client.set("key", "value").await, Err(Error::Closed)));
    assert!(client.close().is_ok());
}

#[tokio::test]
async fn test_pool_stats_after_commands() {
    let mock = start_mock_redis(|_| bulk("v")).await;
    let client = FailoverClient::new(&test_options(&[mock.addr])).unwrap();

    for _ in 0..5 {
        let _: Option<String> = client.get("key").await.unwrap();
    }

    let stats = client.pool_stats();
    assert_eq!(stats.requests, 5);
    assert_eq!(stats.hits, 4);
    assert_eq!(stats.timeouts, 0);
    assert_eq!(stats.total_conns, 1);
    assert_eq!(stats.free_conns, 1);
    client.close().unwrap();
}

#[tokio::test]
async fn test_pipeline_runs_on_one_instance() {
    let a = start_mock_redis(|_| OK.to_string()).await;
    let b = start_mock_redis(|_| OK.to_string()).await;
    let client = FailoverClient::new(&test_options(&[a.addr, b.addr])).unwrap();

    let replies = client
        .pipelined(|pipe| {
            pipe.cmd("SET").arg("a").arg(1);
            pipe.cmd("SET").arg("b").arg(2);
            pipe.cmd("SET").arg("c").arg(3);
        })
        .await
        .unwrap();

    assert_eq!(replies.len(), 3);
    let counts = (a.count("SET"), b.count("SET"));
    assert!(counts == (3, 0) || counts == (0, 3), "{counts:?}");
    client.close().unwrap();
}

#[tokio::test]
async fn test_client_from_config_file() {
    let a = start_mock_redis(|_| bulk("a")).await;
    let b = start_mock_redis(|_| bulk("b")).await;
    let options = parse_config(&format!(
        r#"
        addrs = ["{}", "{}"]

        [client]
        dial_timeout_ms = 500
        pool_size = 2

        [balancer]
        check_interval_ms = 200
        mode = "least_conn"

        [failover]
        failover_retries = 1
        "#,
        a.addr, b.addr
    ))
    .unwrap();
    let client = FailoverClient::new(&options).unwrap();

    assert_eq!(client.failover_retries(), 1);
    assert_eq!(client.balancer().mode(), xredis::BalanceMode::RoundRobin);
    let first: Option<String> = client.get("key").await.unwrap();
    let second: Option<String> = client.get("key").await.unwrap();
    assert_ne!(first, second);
    client.close().unwrap();
}

#[tokio::test]
async fn test_cancelled_command_releases_its_connection() {
    let mock = start_scripted_redis(|args| {
        ping_or(args, |key| match key {
            "slow" => Action::Delay(Duration::from_millis(300), bulk("slow")),
            _ => Action::Reply(bulk("fast")),
        })
    })
    .await;
    let client = FailoverClient::new(&test_options(&[mock.addr])).unwrap();

    let slow = client.get("slow");
    let cancelled: Result<xredis::Result<Option<String>>, _> =
        tokio::time::timeout(Duration::from_millis(50), slow).await;
    assert!(cancelled.is_err());

    let stats = client.pool_stats();
    assert_eq!(stats.total_conns, 0);
    assert_eq!(stats.free_conns, 0);

    let value: Option<String> = client.get("fast").await.unwrap();
    assert_eq!(value.as_deref(), Some("fast"));
    let stats = client.pool_stats();
    assert_eq!(stats.total_conns, 1);
    assert_eq!(stats.free_conns, 1);
    client.close().unwrap();
}

#[tokio::test]
async fn test_idle_connections_are_reaped() {
    let mock = start_mock_redis(|_| bulk("v")).await;
    let mut options = test_options(&[mock.addr]);
    options.client.idle_timeout_ms = Some(100);
    options.client.idle_check_frequency_ms = 50;
    let client = FailoverClient::new(&options).unwrap();

    let _: Option<String> = client.get("key").await.unwrap();
    assert_eq!(client.pool_stats().free_conns, 1);

    assert!(
        wait_until(Duration::from_secs(3), || {
            let stats = client.pool_stats();
            stats.total_conns == 0 && stats.free_conns == 0
        })
        .await,
        "idle connection never reaped: {:?}",
        client.pool_stats()
    );
    client.close().unwrap();
}

#[tokio::test]
async fn test_connection_closed_by_server_is_not_reused() {
    let mock = start_scripted_redis(|args| {
        ping_or(args, |key| match key {
            "bye" => Action::Close,
            _ => Action::Reply(bulk("v")),
        })
    })
    .await;
    let mut options = test_options(&[mock.addr]);
    options.failover.failover_retries = Some(0);
    options.failover.max_retries = 0;
    let client = FailoverClient::new(&options).unwrap();

    let _: Option<String> = client.get("key").await.unwrap();
    let dropped: xredis::Result<Option<String>> = client.get("bye").await;
    assert!(matches!(dropped, Err(Error::Redis(_)) | Err(Error::Timeout)), "{dropped:?}");
    assert_eq!(client.pool_stats().total_conns, 0);
    assert_eq!(client.pool_stats().free_conns, 0);

    let _: Option<String> = client.get("key").await.unwrap();
    let stats = client.pool_stats();
    assert_eq!(stats.requests, 3);
    // Only the second command reused a connection.
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.total_conns, 1);
    client.close().unwrap();
}

#[tokio::test]
async fn test_unanswered_command_times_out_and_drops_connection() {
    let mock = start_scripted_redis(|args| {
        ping_or(args, |key| match key {
            "stuck" => Action::Hang,
            _ => Action::Reply(bulk("v")),
        })
    })
    .await;
    let mut options = test_options(&[mock.addr]);
    options.failover.failover_retries = Some(0);
    options.failover.max_retries = 0;
    let client = FailoverClient::new(&options).unwrap();

    let stuck: xredis::Result<Option<String>> = client.get("stuck").await;
    assert!(matches!(stuck, Err(Error::Timeout)), "{stuck:?}");
    assert_eq!(client.pool_stats().total_conns, 0);

    let _: Option<String> = client.get("key").await.unwrap();
    let stats = client.pool_stats();
    assert_eq!(stats.hits, 0);
    assert_eq!(stats.total_conns, 1);
    client.close().unwrap();
}

#[tokio::test]
async fn test_health_probe_finishing_after_close_is_discarded() {
    let mock = start_scripted_redis(|args| {
        if args[0].eq_ignore_ascii_case("PING") {
            Action::Delay(Duration::from_millis(200), PONG.to_string())
        } else {
            Action::Reply(OK.to_string())
        }
    })
    .await;
    let options = test_options(&[mock.addr]).instance_options().remove(0);
    let pool = ConnPool::new(&options).unwrap();

    let probing = tokio::spawn({
        let pool = pool.clone();
        async move { pool.probe().await }
    });
    tokio::time::sleep(Duration::from_millis(100)).await;
    pool.close().unwrap();

    assert!(matches!(probing.await.unwrap(), Err(Error::Closed)));
    assert!(matches!(pool.probe().await, Err(Error::Closed)));
}
