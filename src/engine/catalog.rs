// ==========================================
// MES辅助排程系统 - 兼容关系目录
// ==========================================
// 职责: 每次运行构建一次的只读内存索引
// map[物料] -> 按权重降序的候选设备/模具
// 无关系时返回空切片 (不可行, 原因 no-relation),
// 不作为错误处理
// ==========================================

use crate::domain::{Device, Mold};
use crate::repository::{
    DeviceRepository, MaterialDeviceRelationRepository, MaterialMoldRelationRepository,
    MoldRepository, RepositoryResult,
};
use std::collections::HashMap;
use tracing::warn;

// ==========================================
// 候选条目
// ==========================================

/// 候选设备 (携带关系权重)
#[derive(Debug, Clone)]
pub struct DeviceCandidate {
    pub device: Device,
    pub weight: i32,
}

/// 候选模具 (携带关系权重与节拍数据)
#[derive(Debug, Clone)]
pub struct MoldCandidate {
    pub mold: Mold,
    pub weight: i32,
    pub cycle_time_s: f64,
    pub output_per_cycle: f64,
}

impl MoldCandidate {
    /// 小时产出率 (件/时)
    pub fn hourly_output(&self) -> f64 {
        if self.cycle_time_s <= 0.0 {
            return 0.0;
        }
        self.output_per_cycle * 3600.0 / self.cycle_time_s
    }
}

// ==========================================
// RelationCatalog - 兼容关系目录
// ==========================================
pub struct RelationCatalog {
    devices: HashMap<String, Vec<DeviceCandidate>>,
    molds: HashMap<String, Vec<MoldCandidate>>,
}

impl RelationCatalog {
    /// 从仓储加载并构建索引 (每次排程运行一次)
    pub fn load(
        device_relation_repo: &MaterialDeviceRelationRepository,
        mold_relation_repo: &MaterialMoldRelationRepository,
        device_repo: &DeviceRepository,
        mold_repo: &MoldRepository,
    ) -> RepositoryResult<Self> {
        let device_index: HashMap<String, Device> = device_repo
            .list_all()?
            .into_iter()
            .map(|d| (d.device_code.clone(), d))
            .collect();

        let mold_index: HashMap<String, Mold> = mold_repo
            .list_all()?
            .into_iter()
            .map(|m| (m.mold_code.clone(), m))
            .collect();

        let mut devices: HashMap<String, Vec<DeviceCandidate>> = HashMap::new();
        for relation in device_relation_repo.list_all()? {
            match device_index.get(&relation.device_code) {
                Some(device) => {
                    devices
                        .entry(relation.material_code.clone())
                        .or_default()
                        .push(DeviceCandidate {
                            device: device.clone(),
                            weight: relation.weight,
                        });
                }
                None => {
                    // 外键保证下不应出现; 出现则跳过该关系行
                    warn!(
                        material = %relation.material_code,
                        device = %relation.device_code,
                        "设备关系引用了不存在的设备, 已跳过"
                    );
                }
            }
        }

        let mut molds: HashMap<String, Vec<MoldCandidate>> = HashMap::new();
        for relation in mold_relation_repo.list_all()? {
            match mold_index.get(&relation.mold_code) {
                Some(mold) => {
                    molds
                        .entry(relation.material_code.clone())
                        .or_default()
                        .push(MoldCandidate {
                            mold: mold.clone(),
                            weight: relation.weight,
                            cycle_time_s: relation.cycle_time_s,
                            output_per_cycle: relation.output_per_cycle,
                        });
                }
                None => {
                    warn!(
                        material = %relation.material_code,
                        mold = %relation.mold_code,
                        "模具关系引用了不存在的模具, 已跳过"
                    );
                }
            }
        }

        // 权重降序, 编码升序保证确定性
        for candidates in devices.values_mut() {
            candidates.sort_by(|a, b| {
                b.weight
                    .cmp(&a.weight)
                    .then_with(|| a.device.device_code.cmp(&b.device.device_code))
            });
        }
        for candidates in molds.values_mut() {
            candidates.sort_by(|a, b| {
                b.weight
                    .cmp(&a.weight)
                    .then_with(|| a.mold.mold_code.cmp(&b.mold.mold_code))
            });
        }

        Ok(Self { devices, molds })
    }

    /// 某物料的候选设备 (权重降序; 无关系返回空切片)
    pub fn candidate_devices(&self, material_code: &str) -> &[DeviceCandidate] {
        self.devices
            .get(material_code)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// 某物料的候选模具 (权重降序; 无关系返回空切片)
    pub fn candidate_molds(&self, material_code: &str) -> &[MoldCandidate] {
        self.molds
            .get(material_code)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use rusqlite::Connection;
    use std::sync::{Arc, Mutex};

    fn setup() -> Arc<Mutex<Connection>> {
        let conn = Connection::open_in_memory().unwrap();
        db::configure_sqlite_connection(&conn).unwrap();
        db::init_schema(&conn).unwrap();

        conn.execute_batch(
            r#"
            INSERT INTO material (material_code, material_name) VALUES ('MAT-001', '物料一');
            INSERT INTO device (device_code, device_name, status) VALUES ('DEV-001', '一号机', 'NORMAL');
            INSERT INTO device (device_code, device_name, status) VALUES ('DEV-002', '二号机', 'NORMAL');
            INSERT INTO device (device_code, device_name, status) VALUES ('DEV-003', '三号机', 'NORMAL');
            INSERT INTO mold (mold_code, mold_name, status, quantity) VALUES ('MOLD-001', '一号模', 'NORMAL', 1);
            INSERT INTO material_device_relation (relation_id, material_code, device_code, weight)
              VALUES ('r1', 'MAT-001', 'DEV-001', 60);
            INSERT INTO material_device_relation (relation_id, material_code, device_code, weight)
              VALUES ('r2', 'MAT-001', 'DEV-002', 95);
            INSERT INTO material_device_relation (relation_id, material_code, device_code, weight)
              VALUES ('r3', 'MAT-001', 'DEV-003', 60);
            INSERT INTO material_mold_relation (relation_id, material_code, mold_code, weight, cycle_time_s, output_per_cycle)
              VALUES ('r4', 'MAT-001', 'MOLD-001', 80, 30.0, 2.0);
            "#,
        )
        .unwrap();

        Arc::new(Mutex::new(conn))
    }

    fn build_catalog(conn: Arc<Mutex<Connection>>) -> RelationCatalog {
        RelationCatalog::load(
            &MaterialDeviceRelationRepository::new(conn.clone()),
            &MaterialMoldRelationRepository::new(conn.clone()),
            &DeviceRepository::new(conn.clone()),
            &MoldRepository::new(conn),
        )
        .unwrap()
    }

    #[test]
    fn test_devices_sorted_by_weight_then_code() {
        let catalog = build_catalog(setup());

        let candidates = catalog.candidate_devices("MAT-001");
        let codes: Vec<&str> = candidates
            .iter()
            .map(|c| c.device.device_code.as_str())
            .collect();
        // 权重 95 在前; 同权重 60 按编码升序
        assert_eq!(codes, vec!["DEV-002", "DEV-001", "DEV-003"]);
    }

    #[test]
    fn test_unknown_material_returns_empty() {
        let catalog = build_catalog(setup());

        assert!(catalog.candidate_devices("MAT-999").is_empty());
        assert!(catalog.candidate_molds("MAT-999").is_empty());
    }

    #[test]
    fn test_mold_candidate_throughput() {
        let catalog = build_catalog(setup());

        let molds = catalog.candidate_molds("MAT-001");
        assert_eq!(molds.len(), 1);
        assert!((molds[0].hourly_output() - 240.0).abs() < f64::EPSILON);
    }
}
