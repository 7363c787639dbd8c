use tempfile::tempdir;
use serde::{Deserialize, Serialize};
use tupo_cache::file::FileCache;
use tupo_core::cache::port::{Cache, CacheExt};

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
struct TestItem {
    id: u32,
    name: String,
}

#[tokio::test]
async fn test_file_cache_raw_ops() {
    let dir = tempdir().unwrap();
    let cache = FileCache::new(dir.path());
    let key = "raw_key";
    let value = vec![1, 2, 3, 4];

    // 测试存取
    cache.set_raw(key, value.clone()).await.unwrap();
    let result = cache.get_raw(key).await.unwrap().unwrap();
    assert_eq!(result, value);

    // 测试覆盖写
    cache.set_raw(key, vec![9]).await.unwrap();
    let result = cache.get_raw(key).await.unwrap().unwrap();
    assert_eq!(result, vec![9]);

    // 测试删除
    cache.del(key).await.unwrap();
    let result = cache.get_raw(key).await.unwrap();
    assert!(result.is_none());

    // 重复删除不报错
    cache.del(key).await.unwrap();
}

#[tokio::test]
async fn test_file_cache_typed_round_trip() {
    let dir = tempdir().unwrap();
    let cache = FileCache::new(dir.path());
    let key = "typed_key";
    let item = TestItem {
        id: 42,
        name: "Tupo".to_string(),
    };

    cache.set(key, &item).await.unwrap();
    let result: TestItem = cache.get(key).await.unwrap().unwrap();
    assert_eq!(result, item);
}

#[tokio::test]
async fn test_missing_key_is_none_not_error() {
    let dir = tempdir().unwrap();
    let cache = FileCache::new(dir.path());

    let raw = cache.get_raw("never_written").await.unwrap();
    assert!(raw.is_none());

    let typed: Option<TestItem> = cache.get("never_written").await.unwrap();
    assert!(typed.is_none());
}

#[tokio::test]
async fn test_corrupted_file_downgrades_to_miss() {
    let dir = tempdir().unwrap();
    let cache = FileCache::new(dir.path());
    let key = "broken";

    let item = TestItem {
        id: 7,
        name: "ok".to_string(),
    };
    cache.set(key, &item).await.unwrap();

    // 截断文件模拟写坏的缓存
    let path = dir.path().join("broken.json");
    tokio::fs::write(&path, b"{\"id\": 7, \"na").await.unwrap();

    // 强类型读取报反序列化错误
    let result: Result<Option<TestItem>, _> = cache.get(key).await;
    assert!(result.is_err());

    // 容错读取降级为未命中
    let lenient: Option<TestItem> = cache.get_or_miss(key).await;
    assert!(lenient.is_none());
}

#[tokio::test]
async fn test_rejects_path_escaping_keys() {
    let dir = tempdir().unwrap();
    let cache = FileCache::new(dir.path());

    assert!(cache.set_raw("../escape", vec![1]).await.is_err());
    assert!(cache.get_raw("a/b").await.is_err());
    assert!(cache.del("").await.is_err());
}

#[tokio::test]
async fn test_creates_missing_root_dir() {
    let dir = tempdir().unwrap();
    let nested = dir.path().join("nested").join("cache");
    let cache = FileCache::new(&nested);

    cache.set_raw("k", vec![1]).await.unwrap();
    assert!(nested.join("k.json").exists());
}
