use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tupo_core::cache::error::CacheError;
use tupo_core::cache::port::Cache;

/// # Summary
/// 基于本地文件系统的持久化缓存实现，每个键对应根目录下的一个 JSON 文件。
///
/// # Invariants
/// - 写入为整文件替换：先写临时文件再重命名，调用返回即写入完成。
/// - 不存在的键读取为 None，而非错误。
/// - 不提供跨进程锁，同一标的的并发写方由部署层保证唯一。
pub struct FileCache {
    // 缓存文件根目录
    root: PathBuf,
}

impl FileCache {
    /// # Summary
    /// 以指定根目录创建实例。目录不存在时延迟到首次写入创建。
    ///
    /// # Arguments
    /// * `root`: 缓存文件根目录。
    ///
    /// # Returns
    /// 初始化后的 FileCache 实例。
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// # Summary
    /// 将键映射为根目录下的文件路径。
    ///
    /// # Logic
    /// 键被直接用作文件名主干，因此禁止包含路径分隔符或父目录引用。
    ///
    /// # Returns
    /// 合法键返回 `<root>/<key>.json`，非法键返回 `CacheError::Storage`。
    fn path_for(&self, key: &str) -> Result<PathBuf, CacheError> {
        if key.is_empty()
            || key.contains('/')
            || key.contains('\\')
            || key.contains("..")
        {
            return Err(CacheError::Storage(format!("invalid cache key: {:?}", key)));
        }
        Ok(self.root.join(format!("{}.json", key)))
    }
}

#[async_trait]
impl Cache for FileCache {
    /// # Summary
    /// 设置原始字节数据。
    ///
    /// # Logic
    /// 1. 按需创建根目录。
    /// 2. 写入同目录临时文件。
    /// 3. 重命名覆盖目标文件，完成整文件替换。
    ///
    /// # Arguments
    /// * `key`: 唯一索引。
    /// * `value`: 待存入的字节序列。
    ///
    /// # Returns
    /// * `Result<(), CacheError>` - 文件系统故障映射为 `Storage` 错误。
    async fn set_raw(&self, key: &str, value: Vec<u8>) -> Result<(), CacheError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| CacheError::Storage(e.to_string()))?;
        }

        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &value)
            .await
            .map_err(|e| CacheError::Storage(e.to_string()))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| CacheError::Storage(e.to_string()))?;
        Ok(())
    }

    /// # Summary
    /// 获取原始字节数据。
    ///
    /// # Logic
    /// 读取键对应的文件全部内容；文件不存在视为未命中。
    ///
    /// # Arguments
    /// * `key`: 唯一索引。
    ///
    /// # Returns
    /// * `Result<Option<Vec<u8>>, CacheError>` - 存在返回内容，缺失返回 None。
    async fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CacheError::Storage(e.to_string())),
        }
    }

    /// # Summary
    /// 删除指定键。
    ///
    /// # Logic
    /// 移除键对应的文件，文件本就不存在时视为成功。
    ///
    /// # Arguments
    /// * `key`: 待删除的唯一索引。
    ///
    /// # Returns
    /// * `Result<(), CacheError>` - 除文件系统故障外均返回 Ok。
    async fn del(&self, key: &str) -> Result<(), CacheError> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CacheError::Storage(e.to_string())),
        }
    }
}

impl FileCache {
    /// 缓存文件根目录（测试与诊断用）
    pub fn root(&self) -> &Path {
        &self.root
    }
}
