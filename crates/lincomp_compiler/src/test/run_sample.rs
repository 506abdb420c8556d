use crate::cli::BuildConfig;
use crate::report::PlanReport;
use crate::Plan;
use lincomp_common::config::{CompileOptions, EmitFormat, PassOptions};
use lincomp_common::data::token::{Intent, Token};
use lincomp_common::file_cache::FileCache;
use lincomp_common::report_error::Reportable;
use std::path::Path;

fn config(path: &Path, limit: Option<usize>, elide_copies: bool) -> BuildConfig {
    BuildConfig {
        src_path: path.to_owned(),
        limit,
        emit: EmitFormat::Json,
        options: CompileOptions {
            passes: PassOptions { elide_copies },
            ..Default::default()
        },
    }
}

fn reports(plans: &[Plan]) -> Vec<PlanReport> {
    plans
        .iter()
        .map(|plan| PlanReport::new(&plan.steps, &plan.intents))
        .collect()
}

pub fn run_sample<SrcPath: AsRef<Path>>(
    path: SrcPath,
    limit: Option<usize>,
    elide_copies: bool,
    expected_plans: usize,
    expected_ops: &[&str],
    expected_copies: Option<usize>,
    expected_intents: &[(&str, Intent)],
) {
    let config = config(path.as_ref(), limit, elide_copies);
    let plans = crate::build(&config, &mut FileCache::new()).expect("Compilation failed");

    assert_eq!(plans.len(), expected_plans, "wrong number of plans");
    assert_eq!(plans[0].op_names(), expected_ops);
    if let Some(copies) = expected_copies {
        assert_eq!(plans[0].copy_count(), copies, "wrong number of copies");
    }
    for (token, intent) in expected_intents {
        assert_eq!(
            plans[0].intents.get(&Token::new(*token)),
            Some(intent),
            "wrong intent for token '{}'",
            token
        );
    }

    // Compiling the same problem again must reproduce every plan, names included.
    let again = crate::build(&config, &mut FileCache::new()).expect("Compilation failed");
    assert_eq!(reports(&plans), reports(&again));
}

pub fn run_failing_sample<SrcPath: AsRef<Path>>(path: SrcPath, expected_report: &str) {
    let mut files = FileCache::new();
    let err = match crate::build(&config(path.as_ref(), None, true), &mut files) {
        Ok(plans) => panic!("expected compilation to fail, got {} plan(s)", plans.len()),
        Err(err) => err,
    };

    let mut report = Vec::new();
    err.report(&mut report, &files).expect("Writing report failed");
    let report = String::from_utf8_lossy(&report);
    assert!(
        report.contains(expected_report),
        "report does not mention {:?}:\n{}",
        expected_report,
        report
    );
    assert_eq!(err.exit_status(), 1);
}

macro_rules! sample {
    (
        $name:ident $path:expr ;
        $( all = $all:expr ; )?
        $( elide_copies = $elide:expr ; )?
        plans = $plans:expr ;
        ops = [ $( $op:expr ),* $(,)? ] ;
        $( copies = $copies:expr ; )?
        $( intents = [ $( ( $token:expr, $intent:expr ) ),* $(,)? ] ; )?
    ) => {
        #[test]
        fn $name() {
            #[allow(unused_mut, unused_assignments)]
            let mut limit = Some(1);
            #[allow(unused_mut, unused_assignments)]
            let mut elide_copies = true;
            #[allow(unused_mut, unused_assignments)]
            let mut copies = None;
            #[allow(unused_mut, unused_assignments)]
            let mut intents: Vec<(&str, lincomp_common::data::token::Intent)> = Vec::new();

            $(
                if $all {
                    limit = None;
                }
            )?

            $(
                elide_copies = $elide;
            )?

            $(
                copies = Some($copies);
            )?

            $(
                intents = vec![ $( ($token, $intent) ),* ];
            )?

            crate::test::run_sample::run_sample(
                $path,
                limit,
                elide_copies,
                $plans,
                &[ $( $op ),* ],
                copies,
                &intents,
            );
        }
    };

    (
        $name:ident $path:expr ;
        report = $report:expr ;
    ) => {
        #[test]
        fn $name() {
            crate::test::run_sample::run_failing_sample($path, $report);
        }
    };
}
