use orkit_solver::{
    AssignmentInstance, BranchAndBound, BranchStatus, ColumnGeneration, CuttingStockInstance, LagrangianRelaxation,
    LinearProgram, Scenario, Settings, SolutionStatus, Solver, StochasticInstance, StochasticSolver,
};

#[test]
fn lp_and_ip_agree_on_integral_vertex() {
    // max 3x + 2y, optimum (20, 60) is already integral
    let lp = LinearProgram::from_dense(
        vec![3.0, 2.0],
        vec![vec![2.0, 1.0], vec![1.0, 1.0], vec![1.0, 0.0]],
        vec![100.0, 80.0, 40.0],
        true,
    )
    .unwrap();

    let relaxed = Solver::new().solve(&lp).unwrap();
    assert_eq!(relaxed.status, SolutionStatus::Optimal);
    assert!((relaxed.objective_value - 180.0).abs() < 1e-9);

    let settings = Settings::default();
    let integer = BranchAndBound::new(settings.branch, settings.lp)
        .solve(&lp.clone().all_integer())
        .unwrap();
    assert_eq!(integer.status, BranchStatus::Optimal);
    assert_eq!(integer.x, Some(vec![20.0, 60.0]));
    assert_eq!(integer.tree.nodes().len(), 1);
}

#[test]
fn settings_caps_reach_every_engine() {
    let settings = Settings::default().with_max_iterations(1).with_max_nodes(1);

    let knapsack = LinearProgram::from_dense(vec![5.0, 8.0], vec![vec![1.0, 1.0], vec![5.0, 9.0]], vec![6.0, 45.0], true)
        .unwrap()
        .all_integer();
    let ip = BranchAndBound::new(settings.branch.clone(), settings.lp.clone())
        .solve(&knapsack)
        .unwrap();
    assert_eq!(ip.status, BranchStatus::IterationLimit);
    assert_eq!(ip.nodes_explored, 1);

    let crowded = AssignmentInstance::new(vec![vec![1.0, 3.0]; 3], vec![vec![1.0, 1.0]; 3], vec![2.0, 2.0]);
    let lagrangian = LagrangianRelaxation::new(settings.lagrangian.clone()).solve(&crowded).unwrap();
    assert_eq!(lagrangian.lb_history.len(), 1);

    let stock = CuttingStockInstance::from_pairs(100.0, &[(45.0, 97.0), (36.0, 610.0), (31.0, 395.0), (14.0, 211.0)]);
    let colgen = ColumnGeneration::new(settings.column_generation.clone(), settings.lp.clone())
        .solve(&stock)
        .unwrap();
    assert!(colgen.objective_history.len() <= 2);
    assert!(colgen.patterns.len() <= 5);
}

#[test]
fn stochastic_single_scenario_matches_plain_lp() {
    // With one certain scenario the plan is the deterministic optimum
    let instance = StochasticInstance::new(500.0, vec![Scenario::new("Average", 1.0, [2.5, 3.0, 20.0])]);
    let result = StochasticSolver::default().solve(&instance).unwrap();

    assert!(result.success());
    assert_eq!(result.scenario_profits.len(), 1);
    let profit = result.expected_profit.unwrap();
    assert!((profit - result.scenario_profits[0]).abs() < 1e-6);
    // Known deterministic answer: 120 wheat, 80 corn, 300 beets, profit 118600
    assert!((profit - 118_600.0).abs() < 1e-3, "profit {profit}");
}
