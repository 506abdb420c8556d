use lincomp_common::data::token::Intent::{In, InOut, Out};

sample! { gemm "../../samples/gemm.lin";
    all = true;
    plans = 1;
    ops = ["GEMM_0"];
    copies = 0;
    intents = [("a", In), ("X", In), ("Y", In), ("zero", Out)];
}

sample! { symm "../../samples/symm.lin";
    all = true;
    plans = 2;
    ops = ["SYMM_0"];
    copies = 0;
}

sample! { matrix_chain "../../samples/chain.lin";
    all = true;
    plans = 2;
    ops = ["GEMM_0", "GEMM_0"];
}

sample! { solve_spd "../../samples/solve_spd.lin";
    plans = 1;
    ops = ["GEMM", "POSV"];
    copies = 0;
    intents = [("a", In), ("b", In), ("Z", InOut), ("x", InOut), ("info", Out)];
}

sample! { solve_spd_no_elision "../../samples/solve_spd.lin";
    elide_copies = false;
    plans = 1;
    ops = ["COPY", "COPY", "GEMM", "COPY", "POSV"];
    copies = 3;
    intents = [("Z", In), ("x", In)];
}

sample! { no_solution "../../samples/no_solution.lin";
    report = "No sequence of operations";
}

sample! { undeclared_name "../../samples/undeclared_name.lin";
    report = "Undeclared Name";
}

sample! { kind_mismatch "../../samples/kind_mismatch.lin";
    report = "Kind Mismatch";
}

sample! { missing_file "../../samples/does_not_exist.lin";
    report = "File Not Found";
}
