/*! Scenario coverage for the analyses.
 *
 * Programs are assembled through the builder API the way a frontend would
 * emit them, then pushed through constant propagation, dead code, CHA and the
 * two points-to solvers. Each file exercises one analysis family end to end.
 */

mod cha_tests;
mod pta_ci_tests;
mod pta_cs_tests;
