/*
 * Responsibility
 * - Router に紐づける共有コンテキスト (AppState)
 *   - companies: 検索用の in-memory directory
 * - Clone 前提で持つ (内部は Arc で cheap)
 * - 認可パイプラインの設定は各 stage が自前の state として持つので、ここには置かない
 */
use std::sync::Arc;

use crate::services::company::CompanyDirectory;

#[derive(Clone, Debug)]
pub struct AppState {
    pub companies: Arc<CompanyDirectory>,
}

impl AppState {
    pub fn new(companies: CompanyDirectory) -> Self {
        Self {
            companies: Arc::new(companies),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(CompanyDirectory::default())
    }
}
