// ==========================================
// CapacityBlockLocator 集成测试
// ==========================================
// 测试目标: 配置驱动的块布局、区域划分、角色合并
// ==========================================


use pi_capacity_recon::config::RowWindow;
use pi_capacity_recon::domain::CapacityGrid;
use pi_capacity_recon::{EngineConfig, ReconcileEngine};
use test_helpers::{role, test_config, GridBuilder, RoleRow};

#[test]
fn test_role_aliases_merge_within_block() {
    let grid = GridBuilder::new(30, 11)
        .value_stream(0, "MMPM")
        .team_block(
            1,
            0,
            "borg",
            &[role("AQA", "4"), role("MQA", "3"), role("W-DEV", "6"), role("wdev", "1")],
            &[role("QA", "2")],
        )
        .build();
    let engine = ReconcileEngine::new(test_config()).unwrap();
    let blocks = engine.locate(&grid);

    assert_eq!(blocks.len(), 1);
    let block = &blocks[0];
    assert_eq!(block.team, "BORG");
    assert_eq!(block.roles.len(), 2);

    let qa = block.role("QA").unwrap();
    assert_eq!(qa.before_ff(), 7);
    assert_eq!(qa.after_ff(), 2);
    assert_eq!(qa.total(), 9);
    assert_eq!(block.role("W-DEV").unwrap().before_ff(), 7);
}

#[test]
fn test_stop_marker_and_row_limit() {
    let grid = GridBuilder::new(30, 11)
        .value_stream(0, "MMPM")
        .team_block(
            1,
            0,
            "Borg",
            &[
                role("BE", "1"),
                role("FE", "1"),
                role("QA", "1"),
                role("UX", "1"),
                role("BA", "1"),
                role("DEVOPS", "1"),
                role("M-DEV", "50"), // 第 7 行，超出上限
            ],
            &[],
        )
        .build();
    let engine = ReconcileEngine::new(test_config()).unwrap();
    let blocks = engine.locate(&grid);
    assert_eq!(blocks[0].before_ff(), 6);
    assert!(blocks[0].role("M-DEV").is_none());

    let grid = GridBuilder::new(30, 11)
        .value_stream(0, "MMPM")
        .team_block(
            1,
            0,
            "Borg",
            &[role("BE", "5"), role("Base Capacity", "100"), role("FE", "5")],
            &[],
        )
        .build();
    let blocks = engine.locate(&grid);
    assert_eq!(blocks[0].before_ff(), 5);
}

#[test]
fn test_lenient_cells_and_iterations() {
    let grid = GridBuilder::new(30, 11)
        .value_stream(0, "MMPM")
        .team_block(
            1,
            0,
            "Borg",
            &[RoleRow {
                role: "BE",
                total: "1,200.5",
                iterations: ["1.1", "-", "", "abc", "2", "0"],
            }],
            &[RoleRow {
                role: "BE",
                total: "-",
                iterations: ["", "", "", "", "", "3"],
            }],
        )
        .build();
    let engine = ReconcileEngine::new(test_config()).unwrap();
    let block = &engine.locate(&grid)[0];

    assert_eq!(block.before_ff(), 1201);
    assert_eq!(block.after_ff(), 0);
    assert_eq!(block.by_iteration(), [2, 0, 0, 0, 2, 3]);
}

/// 自定义布局：块 8 列宽、12 行高，标记窗口前移
fn compact_config() -> EngineConfig {
    let mut config = test_config();
    let layout = &mut config.capacity_layout;
    layout.block_height = 12;
    layout.block_width = 10;
    layout.before_ff_window = RowWindow::new(2, 3);
    layout.after_ff_window = RowWindow::new(6, 7);
    layout.max_role_rows = 2;
    config
}

fn compact_grid() -> CapacityGrid {
    GridBuilder::new(30, 20)
        .value_stream(0, "MMPM")
        .value_stream(10, "Unknown VS")
        // Borg: 锚点 1，before 标记 3，after 标记 7
        .set(1, 0, "Borg")
        .set(2, 0, "Allocation Type")
        .set(3, 0, "before FF (sprints 1-4)")
        .set(4, 1, "BE")
        .set(4, 9, "12")
        .set(7, 0, "AFTER ff")
        .set(8, 1, "BE")
        .set(8, 9, "3")
        // Hive: 锚点 13
        .set(13, 0, "Hive")
        .set(14, 0, "allocation type")
        .set(15, 0, "Before FF")
        .set(16, 1, "FE")
        .set(16, 9, "4")
        // 未配置价值流中的团队
        .set(1, 10, "Cube")
        .set(2, 10, "Allocation Type")
        .build()
}

#[test]
fn test_configured_layout_drives_scan() {
    let engine = ReconcileEngine::new(compact_config()).unwrap();
    let (blocks, stats) = engine.locator().locate_with_stats(&compact_grid());

    assert_eq!(stats.regions, 2);
    assert_eq!(stats.unknown_regions, 1);
    assert_eq!(stats.truncated_regions, 1);
    assert_eq!(blocks.len(), 2);
    assert_eq!(stats.missing_after_ff, 1);

    let borg = blocks.iter().find(|b| b.team == "BORG").unwrap();
    assert_eq!(borg.before_ff(), 12);
    assert_eq!(borg.after_ff(), 3);

    let hive = blocks.iter().find(|b| b.team == "HIVE").unwrap();
    assert_eq!(hive.anchor_row, 13);
    assert_eq!(hive.role("FE").unwrap().before_ff(), 4);
}

#[test]
fn test_default_layout_misses_compact_markers() {
    let engine = ReconcileEngine::new(test_config()).unwrap();
    let (blocks, stats) = engine.locator().locate_with_stats(&compact_grid());

    // 默认 11 列宽：MMPM 区域 (0..10) 只扫描第 0 列
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].team, "BORG");
    assert_eq!(blocks[0].total(), 0);
    assert_eq!(stats.missing_before_ff, 1);
    assert_eq!(stats.missing_after_ff, 1);
}

#[test]
fn test_invalid_layout_is_contract_violation() {
    let mut config = test_config();
    config.capacity_layout.after_ff_window = RowWindow::new(30, 31);
    assert!(ReconcileEngine::new(config).is_err());
}
