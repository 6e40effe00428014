use super::*;

#[test]
fn test_free_plan_tool_table() {
    let access = PlanAccess::new(Plan::Free);

    assert!(access.has_access(ToolId::Resize));
    assert!(access.has_access(ToolId::Crop));
    assert!(access.has_access(ToolId::Adjust));
    assert!(access.has_access(ToolId::Text));

    assert!(!access.has_access(ToolId::Background));
    assert!(!access.has_access(ToolId::AiExtender));
    assert!(!access.has_access(ToolId::AiEdit));
}

#[test]
fn test_pro_plan_has_every_tool() {
    let access = PlanAccess::new(Plan::Pro);
    for tool in ToolId::ALL {
        assert!(access.has_access(tool), "pro should have {}", tool);
    }
    assert!(access.restricted_tools().is_empty());
}

#[test]
fn test_restricted_tools_order() {
    let access = PlanAccess::new(Plan::Free);
    assert_eq!(
        access.restricted_tools(),
        vec![ToolId::Background, ToolId::AiExtender, ToolId::AiEdit]
    );
}

#[test]
fn test_check_tool_denial() {
    let access = PlanAccess::new(Plan::Free);
    let err = access.check_tool(ToolId::AiEdit).unwrap_err();
    assert_eq!(err, AccessDenial::ProOnly(ToolId::AiEdit));
    assert_eq!(err.code(), "upgrade_required");
    assert!(err.wants_upgrade());
}

#[test]
fn test_can_create_project_thresholds() {
    let free = PlanAccess::new(Plan::Free);
    assert!(free.can_create_project(0));
    assert!(free.can_create_project(2));
    assert!(!free.can_create_project(3));
    assert!(!free.can_create_project(10));

    let pro = PlanAccess::new(Plan::Pro);
    assert!(pro.can_create_project(2));
    assert!(pro.can_create_project(3));
    assert!(pro.can_create_project(1000));
}

#[test]
fn test_can_export_thresholds() {
    let free = PlanAccess::new(Plan::Free);
    assert!(free.can_export(19));
    assert!(!free.can_export(20));

    let pro = PlanAccess::new(Plan::Pro);
    assert!(pro.can_export(19));
    assert!(pro.can_export(20));
    assert!(pro.can_export(u32::MAX));
}

#[test]
fn test_custom_limits() {
    let limits = PlanLimits {
        free_project_limit: 1,
        free_export_limit: 5,
    };
    let access = PlanAccess::with_limits(Plan::Free, limits);

    assert!(access.can_create_project(0));
    assert_eq!(
        access.check_create_project(1),
        Err(AccessDenial::ProjectLimit { limit: 1 })
    );
    assert_eq!(
        access.check_export(5),
        Err(AccessDenial::ExportLimit { limit: 5 })
    );
}

#[test]
fn test_tool_id_parsing() {
    assert_eq!("ai_extender".parse::<ToolId>().unwrap(), ToolId::AiExtender);
    assert_eq!("resize".parse::<ToolId>().unwrap(), ToolId::Resize);
    assert!(matches!(
        "lasso".parse::<ToolId>(),
        Err(AccessDenial::UnknownTool(_))
    ));

    for tool in ToolId::ALL {
        assert_eq!(tool.as_str().parse::<ToolId>().unwrap(), tool);
    }
}

#[test]
fn test_plan_parsing() {
    assert_eq!("free".parse::<Plan>().unwrap(), Plan::Free);
    assert_eq!(" PRO ".parse::<Plan>().unwrap(), Plan::Pro);
    assert!("enterprise".parse::<Plan>().is_err());
}

#[test]
fn test_serialization() {
    let json = serde_json::to_string(&ToolId::AiEdit).unwrap();
    assert_eq!(json, "\"ai_edit\"");

    let plan: Plan = serde_json::from_str("\"pro\"").unwrap();
    assert_eq!(plan, Plan::Pro);

    let limits: PlanLimits = serde_json::from_str("{}").unwrap();
    assert_eq!(limits, PlanLimits::default());
}
